/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt::Debug;

use serde::Deserialize;

/// Deserializes the provided XML document and asserts that the resulting
/// structure matches the expected value.
pub(crate) fn assert_deserialized_content<T>(xml: &str, expected: T)
where
    T: Debug + for<'de> Deserialize<'de> + PartialEq,
{
    let mut deserializer = quick_xml::de::Deserializer::from_reader(xml.as_bytes());
    let actual: T = serde_path_to_error::deserialize(&mut deserializer)
        .expect("deserialization should succeed");

    assert_eq!(actual, expected, "unexpected deserialized content");
}

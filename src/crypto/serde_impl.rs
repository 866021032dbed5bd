//! Serde support for group elements.
//!
//! Group elements cross the wire in their canonical compressed encoding
//! (48 bytes for `G1`, 96 bytes for `G2`). The helpers here are generic over
//! `group::GroupEncoding`, so the same `#[serde(with = ...)]` attribute works
//! for both groups and for vectors of either.

use std::marker::PhantomData;

use group::GroupEncoding;
use serde::de::Error as DeserializeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const ERR_LEN: &str = "wrong length of deserialized group element";
const ERR_CODE: &str = "deserialized bytes don't encode a group element";

/// A wrapper type to facilitate serialization and deserialization of group
/// elements held inside other containers.
struct GroupWrap<C>(C, PhantomData<C>);

impl<C> GroupWrap<C> {
    fn new(c: C) -> Self {
        GroupWrap(c, PhantomData)
    }
}

impl<C: GroupEncoding> Serialize for GroupWrap<C> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        serialize_group(&self.0, s)
    }
}

impl<'de, C: GroupEncoding> Deserialize<'de> for GroupWrap<C> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(GroupWrap::new(deserialize_group(d)?))
    }
}

/// Serializes the compressed representation of a group element.
pub(crate) fn serialize_group<S, C>(c: &C, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    C: GroupEncoding,
{
    c.to_bytes().as_ref().serialize(s)
}

/// Deserializes the compressed representation of a group element.
pub(crate) fn deserialize_group<'de, D, C>(d: D) -> Result<C, D::Error>
where
    D: Deserializer<'de>,
    C: GroupEncoding,
{
    let bytes = <Vec<u8>>::deserialize(d)?;
    let mut repr = C::Repr::default();
    if bytes.len() != repr.as_ref().len() {
        return Err(D::Error::custom(ERR_LEN));
    }
    repr.as_mut().copy_from_slice(&bytes);
    Option::<C>::from(C::from_bytes(&repr)).ok_or_else(|| D::Error::custom(ERR_CODE))
}

/// Serialization and deserialization of a single group element; for use with
/// `#[serde(with = "serde_impl::group_elem")]`.
pub mod group_elem {
    use super::*;

    /// Serializes the element in compressed form.
    pub fn serialize<S, C>(c: &C, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        C: GroupEncoding,
    {
        serialize_group(c, s)
    }

    /// Deserializes an element from its compressed form.
    pub fn deserialize<'de, D, C>(d: D) -> Result<C, D::Error>
    where
        D: Deserializer<'de>,
        C: GroupEncoding,
    {
        deserialize_group(d)
    }
}

/// Serialization and deserialization of vectors of group elements; for use
/// with `#[serde(with = "serde_impl::group_vec")]`.
pub mod group_vec {
    use super::*;

    /// Serializes all elements in compressed form.
    pub fn serialize<S, C>(vec: &[C], s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        C: GroupEncoding + Clone,
    {
        let wrap_vec: Vec<GroupWrap<C>> = vec.iter().cloned().map(GroupWrap::new).collect();
        wrap_vec.serialize(s)
    }

    /// Deserializes a vector of compressed elements.
    pub fn deserialize<'de, D, C>(d: D) -> Result<Vec<C>, D::Error>
    where
        D: Deserializer<'de>,
        C: GroupEncoding,
    {
        let wrap_vec = <Vec<GroupWrap<C>>>::deserialize(d)?;
        Ok(wrap_vec.into_iter().map(|GroupWrap(c, _)| c).collect())
    }
}

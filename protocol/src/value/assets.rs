//! Native assets: names, per-policy bundles and mint deltas.

use std::cmp::Ordering;
use std::fmt;

use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde::{Deserialize, Serialize};

use super::bignum::{ArithmeticError, BigNum, Int};
use crate::codec::OrderedMap;
use crate::crypto::PolicyId;
use crate::error::DeserializeError;

/// Longest asset name the ledger accepts.
pub const MAX_ASSET_NAME_LEN: usize = 32;

// ---------------------------------------------------------------------------
// AssetName
// ---------------------------------------------------------------------------

/// Up to 32 arbitrary bytes naming an asset under its policy.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    pub fn new(name: Vec<u8>) -> Result<Self, DeserializeError> {
        if name.len() > MAX_ASSET_NAME_LEN {
            return Err(DeserializeError::WrongLength {
                what: "AssetName",
                expected: MAX_ASSET_NAME_LEN,
                found: name.len(),
            });
        }
        Ok(Self(name))
    }

    pub fn name(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, DeserializeError> {
        Self::new(hex::decode(s.trim())?)
    }
}

impl fmt::Debug for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "AssetName({s:?})"),
            Err(_) => write!(f, "AssetName({})", self.to_hex()),
        }
    }
}

impl Encode<()> for AssetName {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(&self.0)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for AssetName {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        AssetName::new(d.bytes()?.to_vec()).map_err(|e| decode::Error::message(e.to_string()))
    }
}

impl Serialize for AssetName {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AssetName {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        AssetName::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Assets / MultiAsset
// ---------------------------------------------------------------------------

/// Amounts per asset name under a single policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assets(OrderedMap<AssetName, BigNum>);

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, name: AssetName, amount: BigNum) -> Option<BigNum> {
        self.0.insert(name, amount)
    }

    pub fn get(&self, name: &AssetName) -> Option<BigNum> {
        self.0.get(name).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AssetName> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetName, &BigNum)> {
        self.0.iter()
    }
}

impl FromIterator<(AssetName, BigNum)> for Assets {
    fn from_iter<I: IntoIterator<Item = (AssetName, BigNum)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Encode<()> for Assets {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

impl<'b> Decode<'b, ()> for Assets {
    fn decode(d: &mut Decoder<'b>, ctx: &mut ()) -> Result<Self, decode::Error> {
        OrderedMap::decode(d, ctx).map(Self)
    }
}

/// Native assets grouped by minting policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiAsset(OrderedMap<PolicyId, Assets>);

impl MultiAsset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of policies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, policy_id: PolicyId, assets: Assets) -> Option<Assets> {
        self.0.insert(policy_id, assets)
    }

    pub fn get(&self, policy_id: &PolicyId) -> Option<&Assets> {
        self.0.get(policy_id)
    }

    /// Sets one leaf, creating the policy bundle if needed.
    pub fn set_asset(
        &mut self,
        policy_id: &PolicyId,
        name: &AssetName,
        amount: BigNum,
    ) -> Option<BigNum> {
        match self.0.get_mut(policy_id) {
            Some(assets) => assets.insert(name.clone(), amount),
            None => {
                let mut assets = Assets::new();
                assets.insert(name.clone(), amount);
                self.0.insert(*policy_id, assets);
                None
            }
        }
    }

    /// Amount of one leaf, zero when absent.
    pub fn get_asset(&self, policy_id: &PolicyId, name: &AssetName) -> BigNum {
        self.0
            .get(policy_id)
            .and_then(|assets| assets.get(name))
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PolicyId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PolicyId, &Assets)> {
        self.0.iter()
    }

    /// Every `(policy, name, amount)` leaf in insertion order.
    pub fn leaves(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, BigNum)> {
        self.0
            .iter()
            .flat_map(|(policy, assets)| assets.iter().map(move |(name, amt)| (policy, name, *amt)))
    }

    /// Total number of distinct `(policy, name)` leaves.
    pub fn num_assets(&self) -> usize {
        self.0.values().map(Assets::len).sum()
    }

    /// Union, checked-summing shared leaves. Left-hand insertion order
    /// comes first.
    pub fn checked_add(&self, rhs: &MultiAsset) -> Result<MultiAsset, ArithmeticError> {
        let mut out = self.clone();
        for (policy, name, amount) in rhs.leaves() {
            let sum = out.get_asset(policy, name).checked_add(&amount)?;
            out.set_asset(policy, name, sum);
        }
        Ok(out)
    }

    /// Pure difference. Leaves that would end up at or below zero are left
    /// out of the result, as are policies left with no leaves.
    pub fn sub(&self, rhs: &MultiAsset) -> MultiAsset {
        let mut out = MultiAsset::new();
        for (policy, assets) in self.0.iter() {
            let mut kept = Assets::new();
            for (name, amount) in assets.iter() {
                let remaining = amount.clamped_sub(&rhs.get_asset(policy, name));
                if !remaining.is_zero() {
                    kept.insert(name.clone(), remaining);
                }
            }
            if !kept.is_empty() {
                out.insert(*policy, kept);
            }
        }
        out
    }

    /// Like [`MultiAsset::sub`], but fails when `rhs` holds more of any
    /// asset than `self`.
    pub fn checked_sub(&self, rhs: &MultiAsset) -> Result<MultiAsset, ArithmeticError> {
        for (policy, name, amount) in rhs.leaves() {
            self.get_asset(policy, name).checked_sub(&amount)?;
        }
        Ok(self.sub(rhs))
    }

    /// Leaf-wise partial order; `None` when each side holds something the
    /// other lacks.
    pub fn partial_compare(&self, rhs: &MultiAsset) -> Option<Ordering> {
        let self_le = self.sub(rhs).is_empty();
        let rhs_le = rhs.sub(self).is_empty();
        match (self_le, rhs_le) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }
}

impl Encode<()> for MultiAsset {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

impl<'b> Decode<'b, ()> for MultiAsset {
    fn decode(d: &mut Decoder<'b>, ctx: &mut ()) -> Result<Self, decode::Error> {
        OrderedMap::decode(d, ctx).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Mint
// ---------------------------------------------------------------------------

/// Signed mint (positive) or burn (negative) deltas under one policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MintAssets(OrderedMap<AssetName, Int>);

impl MintAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_from_entry(name: AssetName, amount: Int) -> Self {
        let mut assets = Self::new();
        assets.insert(name, amount);
        assets
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, name: AssetName, amount: Int) -> Option<Int> {
        self.0.insert(name, amount)
    }

    pub fn get(&self, name: &AssetName) -> Option<Int> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetName, &Int)> {
        self.0.iter()
    }
}

impl Encode<()> for MintAssets {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

impl<'b> Decode<'b, ()> for MintAssets {
    fn decode(d: &mut Decoder<'b>, ctx: &mut ()) -> Result<Self, decode::Error> {
        OrderedMap::decode(d, ctx).map(Self)
    }
}

/// The body's mint field: policy → signed deltas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mint(OrderedMap<PolicyId, MintAssets>);

impl Mint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_from_entry(policy_id: PolicyId, assets: MintAssets) -> Self {
        let mut mint = Self::new();
        mint.insert(policy_id, assets);
        mint
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, policy_id: PolicyId, assets: MintAssets) -> Option<MintAssets> {
        self.0.insert(policy_id, assets)
    }

    pub fn get(&self, policy_id: &PolicyId) -> Option<&MintAssets> {
        self.0.get(policy_id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &PolicyId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PolicyId, &MintAssets)> {
        self.0.iter()
    }

    fn split(&self, positive: bool) -> MultiAsset {
        let mut out = MultiAsset::new();
        for (policy, assets) in self.0.iter() {
            let picked: Assets = assets
                .iter()
                .filter_map(|(name, amount)| {
                    let magnitude = if positive {
                        amount.as_positive()
                    } else {
                        amount.as_negative()
                    };
                    magnitude
                        .filter(|m| !m.is_zero())
                        .map(|m| (name.clone(), m))
                })
                .collect();
            if !picked.is_empty() {
                out.insert(*policy, picked);
            }
        }
        out
    }

    /// The minted half: every strictly positive delta.
    pub fn as_positive_multiasset(&self) -> MultiAsset {
        self.split(true)
    }

    /// The burned half, as magnitudes.
    pub fn as_negative_multiasset(&self) -> MultiAsset {
        self.split(false)
    }
}

impl Encode<()> for Mint {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

impl<'b> Decode<'b, ()> for Mint {
    fn decode(d: &mut Decoder<'b>, ctx: &mut ()) -> Result<Self, decode::Error> {
        OrderedMap::decode(d, ctx).map(Self)
    }
}

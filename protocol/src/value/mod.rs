//! # Value Model
//!
//! Everything that moves through a transaction is a [`Value`]: a lovelace
//! amount plus an optional bundle of native assets. The algebra here is
//! deliberately strict. Addition and subtraction are checked and report
//! [`ArithmeticError`] instead of wrapping, because a wrapped amount is a
//! transaction that either gets rejected or silently mints money.
//!
//! Values are only **partially** ordered. `{5 ADA, 1 FOO}` and
//! `{6 ADA, 0 FOO}` don't dominate each other, so [`Value::compare`]
//! returns a [`ValueOrdering`] with an explicit `Incomparable` arm rather
//! than pretending there is a total order.

pub mod assets;
pub mod bignum;

use std::cmp::Ordering;

use minicbor::data::Type;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

pub use assets::{AssetName, Assets, Mint, MintAssets, MultiAsset, MAX_ASSET_NAME_LEN};
pub use bignum::{ArithmeticError, BigNum, Coin, Epoch, Int, Slot};

use crate::codec::expect_array;

/// Result of comparing two values under the per-component partial order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueOrdering {
    Less,
    Equal,
    Greater,
    /// Each side has more of something than the other.
    Incomparable,
}

impl From<Option<Ordering>> for ValueOrdering {
    fn from(ord: Option<Ordering>) -> Self {
        match ord {
            Some(Ordering::Less) => ValueOrdering::Less,
            Some(Ordering::Equal) => ValueOrdering::Equal,
            Some(Ordering::Greater) => ValueOrdering::Greater,
            None => ValueOrdering::Incomparable,
        }
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Lovelace plus native assets.
///
/// Equality is value equality: a missing bundle and an empty one (or one
/// holding only zero leaves) compare equal.
#[derive(Clone, Debug, Default)]
pub struct Value {
    coin: Coin,
    multiasset: Option<MultiAsset>,
}

impl Value {
    pub fn new(coin: Coin) -> Self {
        Self {
            coin,
            multiasset: None,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Assets only, zero lovelace.
    pub fn new_from_assets(multiasset: MultiAsset) -> Self {
        Self::new_with_assets(Coin::zero(), multiasset)
    }

    pub fn new_with_assets(coin: Coin, multiasset: MultiAsset) -> Self {
        Self {
            coin,
            multiasset: normalize(multiasset),
        }
    }

    pub fn coin(&self) -> Coin {
        self.coin
    }

    pub fn set_coin(&mut self, coin: Coin) {
        self.coin = coin;
    }

    pub fn multiasset(&self) -> Option<&MultiAsset> {
        self.multiasset.as_ref()
    }

    pub fn set_multiasset(&mut self, multiasset: MultiAsset) {
        self.multiasset = normalize(multiasset);
    }

    pub fn has_assets(&self) -> bool {
        self.multiasset.as_ref().is_some_and(|ma| ma.num_assets() > 0)
    }

    pub fn is_zero(&self) -> bool {
        self.coin.is_zero()
            && self
                .multiasset
                .as_ref()
                .map_or(true, |ma| ma.leaves().all(|(_, _, amt)| amt.is_zero()))
    }

    pub fn checked_add(&self, rhs: &Value) -> Result<Value, ArithmeticError> {
        let coin = self.coin.checked_add(&rhs.coin)?;
        let multiasset = match (&self.multiasset, &rhs.multiasset) {
            (Some(lhs), Some(rhs)) => normalize(lhs.checked_add(rhs)?),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        };
        Ok(Value { coin, multiasset })
    }

    /// Fails with `Underflow` if the coin or any asset would go negative.
    pub fn checked_sub(&self, rhs: &Value) -> Result<Value, ArithmeticError> {
        let coin = self.coin.checked_sub(&rhs.coin)?;
        let multiasset = match (&self.multiasset, &rhs.multiasset) {
            (Some(lhs), Some(rhs)) => normalize(lhs.checked_sub(rhs)?),
            (Some(lhs), None) => Some(lhs.clone()),
            (None, Some(rhs)) => {
                if rhs.leaves().any(|(_, _, amt)| !amt.is_zero()) {
                    return Err(ArithmeticError::Underflow);
                }
                None
            }
            (None, None) => None,
        };
        Ok(Value { coin, multiasset })
    }

    /// Floors the coin at zero and drops any asset that would not stay
    /// positive.
    pub fn clamped_sub(&self, rhs: &Value) -> Value {
        let coin = self.coin.clamped_sub(&rhs.coin);
        let multiasset = match (&self.multiasset, &rhs.multiasset) {
            (Some(lhs), Some(rhs)) => normalize(lhs.sub(rhs)),
            (Some(lhs), None) => Some(lhs.clone()),
            (None, _) => None,
        };
        Value { coin, multiasset }
    }

    /// Component-wise partial order.
    pub fn compare(&self, rhs: &Value) -> ValueOrdering {
        self.partial_cmp(rhs).into()
    }
}

/// Drops zero leaves, then policies left empty, then the bundle itself if
/// nothing is left. Insertion order of what remains is kept.
fn normalize(multiasset: MultiAsset) -> Option<MultiAsset> {
    let pruned = if multiasset.leaves().any(|(_, _, amt)| amt.is_zero()) {
        multiasset.sub(&MultiAsset::new())
    } else {
        multiasset
    };
    if pruned.is_empty() {
        None
    } else {
        Some(pruned)
    }
}

impl From<Coin> for Value {
    fn from(coin: Coin) -> Self {
        Value::new(coin)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let empty = MultiAsset::new();
        let lhs = self.multiasset.as_ref().unwrap_or(&empty);
        let rhs = other.multiasset.as_ref().unwrap_or(&empty);
        let assets = lhs.partial_compare(rhs)?;
        match (self.coin.cmp(&other.coin), assets) {
            (coin, Ordering::Equal) => Some(coin),
            (Ordering::Equal, assets) => Some(assets),
            (Ordering::Less, Ordering::Less) => Some(Ordering::Less),
            (Ordering::Greater, Ordering::Greater) => Some(Ordering::Greater),
            _ => None,
        }
    }
}

/// Pure-ADA values encode as a bare uint, anything else as `[coin, assets]`.
impl Encode<()> for Value {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        match &self.multiasset {
            Some(ma) => {
                e.array(2)?.encode(self.coin)?.encode(ma)?;
            }
            None => {
                e.encode(self.coin)?;
            }
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Value {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        match d.datatype()? {
            Type::Array | Type::ArrayIndef => {
                expect_array(d, 2, "value")?;
                let coin = d.decode()?;
                let multiasset = d.decode()?;
                Ok(Value::new_with_assets(coin, multiasset))
            }
            _ => Ok(Value::new(d.decode()?)),
        }
    }
}

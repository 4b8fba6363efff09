//! Mask-rewrite transformer
//!
//! Keeps the bits of the input selected by the mask and takes every other
//! bit from a fixed overwrite address:
//!
//! ```text
//! out = (in & mask) | (overwrite & !mask)
//! ```
//!
//! A typical use is deriving a LAN address from a WAN one by keeping the
//! host part and replacing the prefix, or the other way round.

use crate::common::{Family, TextOrNumber};
use crate::config::{TransformerConfig, decode_options};
use crate::error::{Error, Result};
use crate::traits::{Transformer, TransformerFactory};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const TRANSFORMER_TYPE: &str = "mask_rewrite";

#[derive(Deserialize)]
struct MaskOptions {
    mask: TextOrNumber,
    overwrite: IpAddr,
}

/// Rewrites addresses through a mask and a fixed overwrite address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRewrite {
    mask: IpAddr,
    overwrite: IpAddr,
}

impl MaskRewrite {
    /// Create from a prefix length, checked against the overwrite's width
    pub fn with_prefix(prefix_len: u8, overwrite: IpAddr) -> Result<Self> {
        let bits = Family::of(&overwrite).byte_len() * 8;
        if usize::from(prefix_len) > bits {
            return Err(Error::config(format!(
                "mask prefix /{} too long for {} (max {})",
                prefix_len, overwrite, bits
            )));
        }

        let mask = match overwrite {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::from(
                u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0),
            )),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::from(
                u128::MAX.checked_shl(128 - u32::from(prefix_len)).unwrap_or(0),
            )),
        };

        Ok(Self { mask, overwrite })
    }

    /// Create from an address-shaped mask of the overwrite's family
    pub fn with_mask(mask: IpAddr, overwrite: IpAddr) -> Result<Self> {
        if Family::of(&mask) != Family::of(&overwrite) {
            return Err(Error::config(format!(
                "mask {} and overwrite {} differ in family",
                mask, overwrite
            )));
        }
        Ok(Self { mask, overwrite })
    }

    fn parse(mask: &str, overwrite: IpAddr) -> Result<Self> {
        let mask = mask.trim();
        let mask = mask.strip_prefix('/').unwrap_or(mask);

        if let Ok(literal) = mask.parse::<IpAddr>() {
            return Self::with_mask(literal, overwrite);
        }

        let prefix_len = mask
            .parse::<u8>()
            .map_err(|_| Error::config(format!("invalid mask: {}", mask)))?;
        Self::with_prefix(prefix_len, overwrite)
    }
}

impl Transformer for MaskRewrite {
    fn transform(&self, address: IpAddr) -> Result<IpAddr> {
        match (address, self.mask, self.overwrite) {
            (IpAddr::V4(input), IpAddr::V4(mask), IpAddr::V4(overwrite)) => {
                let (input, mask, overwrite) =
                    (u32::from(input), u32::from(mask), u32::from(overwrite));
                Ok(IpAddr::V4(Ipv4Addr::from(
                    (input & mask) | (overwrite & !mask),
                )))
            }
            (IpAddr::V6(input), IpAddr::V6(mask), IpAddr::V6(overwrite)) => {
                let (input, mask, overwrite) =
                    (u128::from(input), u128::from(mask), u128::from(overwrite));
                Ok(IpAddr::V6(Ipv6Addr::from(
                    (input & mask) | (overwrite & !mask),
                )))
            }
            _ => Err(Error::transform(format!(
                "cannot rewrite {} address {} with {} overwrite {}",
                Family::of(&address),
                address,
                Family::of(&self.overwrite),
                self.overwrite
            ))),
        }
    }

    fn type_name(&self) -> &'static str {
        TRANSFORMER_TYPE
    }
}

/// Factory for the `mask_rewrite` transformer type
pub struct MaskRewriteFactory;

impl TransformerFactory for MaskRewriteFactory {
    fn create(&self, config: &TransformerConfig) -> Result<Box<dyn Transformer>> {
        let options: MaskOptions = decode_options(TRANSFORMER_TYPE, &config.config)?;
        let transformer = MaskRewrite::parse(&options.mask.into_text(), options.overwrite)?;
        Ok(Box::new(transformer))
    }
}

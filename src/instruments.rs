//! Static instrument configuration.
//!
//! Instruments are externally owned configuration: a unique feed code, a
//! semantic category (which field layout the feed uses for it), and a
//! format group (which wire layout it shares with other instruments, used
//! to batch history writes). The engine only reads this table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Semantic asset-class grouping. Determines how the comma-separated feed
/// fields map to price/change/percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cn,
    Us,
    Hk,
    Asia,
    Eu,
    Metal,
    Energy,
    Fx,
    Crypto,
}

impl Category {
    /// Equity-index categories get a plausibility floor on price (see
    /// `Quote::plausible`).
    pub fn is_index(self) -> bool {
        matches!(
            self,
            Category::Cn | Category::Us | Category::Hk | Category::Asia | Category::Eu
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Cn => "cn",
            Category::Us => "us",
            Category::Hk => "hk",
            Category::Asia => "asia",
            Category::Eu => "eu",
            Category::Metal => "metal",
            Category::Energy => "energy",
            Category::Fx => "fx",
            Category::Crypto => "crypto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cn" => Some(Category::Cn),
            "us" => Some(Category::Us),
            "hk" => Some(Category::Hk),
            "asia" => Some(Category::Asia),
            "eu" => Some(Category::Eu),
            "metal" => Some(Category::Metal),
            "energy" => Some(Category::Energy),
            "fx" => Some(Category::Fx),
            "crypto" => Some(Category::Crypto),
            _ => None,
        }
    }
}

/// Wire-layout bucket. Instruments in the same group share an identical raw
/// field layout, so their same-tick history points can be written as one
/// columnar row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatGroup {
    CnIndex,
    UsIndex,
    HkIndex,
    AsiaIndex,
    Futures,
    CnFutures,
    Crypto,
    Fx,
}

impl FormatGroup {
    /// Derives the group from the feed code's prefix. Codes with no known
    /// prefix (e.g. `DINIW`, `USDCNY`) are fx.
    pub fn from_code(code: &str) -> Self {
        if code.starts_with("s_") || code.starts_with("b_") {
            FormatGroup::CnIndex
        } else if code.starts_with("gb_") {
            FormatGroup::UsIndex
        } else if code.starts_with("hk") {
            FormatGroup::HkIndex
        } else if code.starts_with("znb_") {
            FormatGroup::AsiaIndex
        } else if code.starts_with("hf_") {
            FormatGroup::Futures
        } else if code.starts_with("nf_") {
            FormatGroup::CnFutures
        } else if code.starts_with("btc_") {
            FormatGroup::Crypto
        } else {
            FormatGroup::Fx
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormatGroup::CnIndex => "cn_index",
            FormatGroup::UsIndex => "us_index",
            FormatGroup::HkIndex => "hk_index",
            FormatGroup::AsiaIndex => "asia_index",
            FormatGroup::Futures => "futures",
            FormatGroup::CnFutures => "cn_futures",
            FormatGroup::Crypto => "crypto",
            FormatGroup::Fx => "fx",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cn_index" => Some(FormatGroup::CnIndex),
            "us_index" => Some(FormatGroup::UsIndex),
            "hk_index" => Some(FormatGroup::HkIndex),
            "asia_index" => Some(FormatGroup::AsiaIndex),
            "futures" => Some(FormatGroup::Futures),
            "cn_futures" => Some(FormatGroup::CnFutures),
            "crypto" => Some(FormatGroup::Crypto),
            "fx" => Some(FormatGroup::Fx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Instrument {
    pub code: &'static str,
    pub name: &'static str,
    pub category: Category,
}

/// The tracked universe. Codes, display names and categories mirror the
/// upstream feed's naming.
pub const BUILTIN_INSTRUMENTS: &[Instrument] = &[
    Instrument { code: "s_sh000001", name: "上证指数", category: Category::Cn },
    Instrument { code: "s_sz399001", name: "深证成指", category: Category::Cn },
    Instrument { code: "s_sh000300", name: "沪深300", category: Category::Cn },
    Instrument { code: "s_bj899050", name: "北证50", category: Category::Cn },
    Instrument { code: "s_sz399006", name: "创业板指", category: Category::Cn },
    Instrument { code: "s_sh000688", name: "科创50", category: Category::Cn },
    Instrument { code: "s_sh000002", name: "Ａ股指数", category: Category::Cn },
    Instrument { code: "s_sh000003", name: "Ｂ股指数", category: Category::Cn },
    Instrument { code: "gb_ixic", name: "纳斯达克", category: Category::Us },
    Instrument { code: "gb_$dji", name: "道琼斯", category: Category::Us },
    Instrument { code: "gb_$inx", name: "标普500", category: Category::Us },
    Instrument { code: "znb_NKY", name: "日经225", category: Category::Asia },
    Instrument { code: "znb_KOSPI", name: "首尔综合", category: Category::Asia },
    Instrument { code: "znb_TWJQ", name: "台湾加权", category: Category::Asia },
    Instrument { code: "hkHSI", name: "恒生指数", category: Category::Hk },
    Instrument { code: "hkHSTECH", name: "恒生科技", category: Category::Hk },
    Instrument { code: "hkHSCEI", name: "国企指数", category: Category::Hk },
    Instrument { code: "b_UKX", name: "富时100", category: Category::Eu },
    Instrument { code: "b_DAX", name: "德国DAX", category: Category::Eu },
    Instrument { code: "b_CAC", name: "法国CAC40", category: Category::Eu },
    Instrument { code: "b_FTSEMIB", name: "意大利MIB", category: Category::Eu },
    Instrument { code: "hf_XAU", name: "伦敦金", category: Category::Metal },
    Instrument { code: "hf_XAG", name: "伦敦银", category: Category::Metal },
    Instrument { code: "hf_GC", name: "纽约黄金", category: Category::Metal },
    Instrument { code: "hf_SI", name: "纽约白银", category: Category::Metal },
    Instrument { code: "hf_CAD", name: "伦铜", category: Category::Metal },
    Instrument { code: "hf_HG", name: "美铜", category: Category::Metal },
    Instrument { code: "nf_AU0", name: "黄金连续", category: Category::Metal },
    Instrument { code: "hf_CL", name: "纽约原油", category: Category::Energy },
    Instrument { code: "hf_OIL", name: "布伦特原油", category: Category::Energy },
    Instrument { code: "DINIW", name: "美元指数", category: Category::Fx },
    Instrument { code: "USDCNY", name: "美元人民币", category: Category::Fx },
    Instrument { code: "EURCNY", name: "欧元人民币", category: Category::Fx },
    Instrument { code: "CNYJPY", name: "人民币日元", category: Category::Fx },
    Instrument { code: "EURUSD", name: "欧元美元", category: Category::Fx },
    Instrument { code: "USDJPY", name: "美元日元", category: Category::Fx },
    Instrument { code: "GBPUSD", name: "英镑美元", category: Category::Fx },
    Instrument { code: "btc_btcbtcusd", name: "比特币", category: Category::Crypto },
    Instrument { code: "btc_btcethusd", name: "以太坊", category: Category::Crypto },
    Instrument { code: "btc_btcsolusd", name: "索拉纳", category: Category::Crypto },
    Instrument { code: "btc_btcbnbusd", name: "币安币", category: Category::Crypto },
    Instrument { code: "btc_btcxrpusd", name: "瑞波币", category: Category::Crypto },
];

/// Read-only lookup over the configured instruments.
#[derive(Clone)]
pub struct InstrumentSet {
    by_code: HashMap<&'static str, Instrument>,
    ordered: Vec<&'static str>,
}

impl InstrumentSet {
    pub fn builtin() -> Self {
        Self::new(BUILTIN_INSTRUMENTS)
    }

    pub fn new(instruments: &'static [Instrument]) -> Self {
        let by_code = instruments.iter().map(|i| (i.code, *i)).collect();
        let ordered = instruments.iter().map(|i| i.code).collect();
        Self { by_code, ordered }
    }

    pub fn get(&self, code: &str) -> Option<&Instrument> {
        self.by_code.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// All configured codes, in declaration order (the order the scheduled
    /// cycle requests them from the feed).
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_group_follows_code_prefix() {
        assert_eq!(FormatGroup::from_code("s_sh000001"), FormatGroup::CnIndex);
        assert_eq!(FormatGroup::from_code("b_DAX"), FormatGroup::CnIndex);
        assert_eq!(FormatGroup::from_code("gb_ixic"), FormatGroup::UsIndex);
        assert_eq!(FormatGroup::from_code("hkHSI"), FormatGroup::HkIndex);
        assert_eq!(FormatGroup::from_code("znb_NKY"), FormatGroup::AsiaIndex);
        assert_eq!(FormatGroup::from_code("hf_XAU"), FormatGroup::Futures);
        assert_eq!(FormatGroup::from_code("nf_AU0"), FormatGroup::CnFutures);
        assert_eq!(FormatGroup::from_code("btc_btcbtcusd"), FormatGroup::Crypto);
        // No recognized prefix falls through to fx.
        assert_eq!(FormatGroup::from_code("DINIW"), FormatGroup::Fx);
        assert_eq!(FormatGroup::from_code("EURUSD"), FormatGroup::Fx);
    }

    #[test]
    fn group_strings_round_trip() {
        for g in [
            FormatGroup::CnIndex,
            FormatGroup::UsIndex,
            FormatGroup::HkIndex,
            FormatGroup::AsiaIndex,
            FormatGroup::Futures,
            FormatGroup::CnFutures,
            FormatGroup::Crypto,
            FormatGroup::Fx,
        ] {
            assert_eq!(FormatGroup::parse(g.as_str()), Some(g));
        }
    }

    #[test]
    fn builtin_set_resolves_known_codes() {
        let set = InstrumentSet::builtin();
        assert!(set.contains("s_sh000001"));
        assert!(set.contains("btc_btcxrpusd"));
        assert!(!set.contains("s_sh999999"));
        assert_eq!(set.get("hkHSI").unwrap().category, Category::Hk);
        assert_eq!(set.len(), BUILTIN_INSTRUMENTS.len());
    }

    #[test]
    fn index_categories_are_flagged() {
        assert!(Category::Cn.is_index());
        assert!(Category::Eu.is_index());
        assert!(!Category::Metal.is_index());
        assert!(!Category::Crypto.is_index());
    }
}

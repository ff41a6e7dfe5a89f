//! Named numeric columns of the mined-transaction feature table.
//!
//! Model formulas refer to columns by the names used in the upstream
//! `minedtx2` table (plus the derived `confirmTime`, `hpa2` and
//! `gasCat1`..`gasCat5`). Resolving them into a [`Column`] up front means
//! a typo in a formula fails before any data is read.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::error::AnalysisError;

/// One of the five mutually exclusive `gas_offered` quantile buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GasCategory {
    /// `gas_offered <= q50`
    Cat1,
    /// `q50 < gas_offered <= q75`
    Cat2,
    /// `q75 < gas_offered <= q95`
    Cat3,
    /// `q95 < gas_offered < q99`
    Cat4,
    /// `gas_offered >= q99`
    Cat5,
}

impl GasCategory {
    pub const ALL: [GasCategory; 5] = [
        GasCategory::Cat1,
        GasCategory::Cat2,
        GasCategory::Cat3,
        GasCategory::Cat4,
        GasCategory::Cat5,
    ];

    /// Zero-based position of the bucket.
    pub fn index(self) -> usize {
        match self {
            GasCategory::Cat1 => 0,
            GasCategory::Cat2 => 1,
            GasCategory::Cat3 => 2,
            GasCategory::Cat4 => 3,
            GasCategory::Cat5 => 4,
        }
    }

    /// Column name of the 0/1 indicator for this bucket.
    pub fn name(self) -> &'static str {
        match self {
            GasCategory::Cat1 => "gasCat1",
            GasCategory::Cat2 => "gasCat2",
            GasCategory::Cat3 => "gasCat3",
            GasCategory::Cat4 => "gasCat4",
            GasCategory::Cat5 => "gasCat5",
        }
    }
}

/// A numeric column that can appear in a model formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    ConfirmTime,
    BlockPosted,
    BlockMined,
    GasOffered,
    GasPrice,
    HashpowerAccepting,
    TxAtabove,
    TxUnchained,
    Highgas2,
    Chained,
    RoundGp10Gwei,
    Hpa2,
    GasCat(GasCategory),
}

impl Column {
    /// The raw upstream column a value is read or derived from.
    ///
    /// `confirmTime` has no single source; it is derived from both block
    /// numbers and validated by the feature builder itself.
    pub fn source(self) -> Option<Column> {
        match self {
            Column::ConfirmTime => None,
            Column::Hpa2 => Some(Column::HashpowerAccepting),
            Column::GasCat(_) => Some(Column::GasOffered),
            raw => Some(raw),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::ConfirmTime => "confirmTime",
            Column::BlockPosted => "block_posted",
            Column::BlockMined => "block_mined",
            Column::GasOffered => "gas_offered",
            Column::GasPrice => "gas_price",
            Column::HashpowerAccepting => "hashpower_accepting",
            Column::TxAtabove => "tx_atabove",
            Column::TxUnchained => "tx_unchained",
            Column::Highgas2 => "highgas2",
            Column::Chained => "chained",
            Column::RoundGp10Gwei => "round_gp_10gwei",
            Column::Hpa2 => "hpa2",
            Column::GasCat(category) => category.name(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let column = match s {
            "confirmTime" => Column::ConfirmTime,
            "block_posted" => Column::BlockPosted,
            "block_mined" => Column::BlockMined,
            "gas_offered" => Column::GasOffered,
            "gas_price" => Column::GasPrice,
            "hashpower_accepting" => Column::HashpowerAccepting,
            "tx_atabove" => Column::TxAtabove,
            "tx_unchained" => Column::TxUnchained,
            "highgas2" => Column::Highgas2,
            "chained" => Column::Chained,
            "round_gp_10gwei" => Column::RoundGp10Gwei,
            "hpa2" => Column::Hpa2,
            other => {
                return GasCategory::ALL
                    .iter()
                    .find(|category| category.name() == other)
                    .map(|category| Column::GasCat(*category))
                    .ok_or_else(|| AnalysisError::unknown_column(other))
            }
        };
        Ok(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_named_column_back_to_itself() {
        let mut columns = vec![
            Column::ConfirmTime,
            Column::BlockPosted,
            Column::BlockMined,
            Column::GasOffered,
            Column::GasPrice,
            Column::HashpowerAccepting,
            Column::TxAtabove,
            Column::TxUnchained,
            Column::Highgas2,
            Column::Chained,
            Column::RoundGp10Gwei,
            Column::Hpa2,
        ];
        columns.extend(GasCategory::ALL.iter().map(|c| Column::GasCat(*c)));

        for column in columns {
            assert_eq!(column.name().parse::<Column>().unwrap(), column);
        }
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = "gasCat6".parse::<Column>().unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownColumn { ref name } if name == "gasCat6"));
    }

    #[test]
    fn derived_columns_point_at_their_raw_source() {
        assert_eq!(Column::Hpa2.source(), Some(Column::HashpowerAccepting));
        assert_eq!(
            Column::GasCat(GasCategory::Cat3).source(),
            Some(Column::GasOffered)
        );
        assert_eq!(Column::ConfirmTime.source(), None);
        assert_eq!(Column::Highgas2.source(), Some(Column::Highgas2));
    }
}

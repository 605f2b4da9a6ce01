//! TCGA study (cohort) codes
//!
//! The PanCancer Atlas tables tag every molecular row with a `Study` code and
//! every clinical row with an `acronym`; both use the same 33 codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::FeatureCatalogError;

macro_rules! studies {
    ($($variant:ident => $code:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "UPPERCASE")]
        pub enum Study {
            $($variant),+
        }

        impl Study {
            pub const ALL: &'static [Study] = &[$(Study::$variant),+];

            pub fn code(&self) -> &'static str {
                match self {
                    $(Study::$variant => $code),+
                }
            }
        }

        impl FromStr for Study {
            type Err = FeatureCatalogError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($code => Ok(Study::$variant),)+
                    _ => Err(FeatureCatalogError::UnknownStudy {
                        code: s.to_string(),
                    }),
                }
            }
        }
    };
}

studies! {
    Acc => "ACC",
    Blca => "BLCA",
    Brca => "BRCA",
    Cesc => "CESC",
    Chol => "CHOL",
    Coad => "COAD",
    Dlbc => "DLBC",
    Esca => "ESCA",
    Gbm => "GBM",
    Hnsc => "HNSC",
    Kich => "KICH",
    Kirc => "KIRC",
    Kirp => "KIRP",
    Laml => "LAML",
    Lgg => "LGG",
    Lihc => "LIHC",
    Luad => "LUAD",
    Lusc => "LUSC",
    Meso => "MESO",
    Ov => "OV",
    Paad => "PAAD",
    Pcpg => "PCPG",
    Prad => "PRAD",
    Read => "READ",
    Sarc => "SARC",
    Skcm => "SKCM",
    Stad => "STAD",
    Tgct => "TGCT",
    Thca => "THCA",
    Thym => "THYM",
    Ucec => "UCEC",
    Ucs => "UCS",
    Uvm => "UVM",
}

impl Default for Study {
    fn default() -> Self {
        Study::Ucec
    }
}

impl fmt::Display for Study {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

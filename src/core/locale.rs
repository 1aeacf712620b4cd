// FilterGrid - core/locale.rs
//
// Filter popup languages: sentinel labels and localized month names.

use chrono::{DateTime, Locale, NaiveDate, NaiveTime, Utc};
use std::str::FromStr;

/// Language used for popup labels and date-tree month names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    French,
    German,
    Spanish,
}

impl Language {
    pub fn all() -> &'static [Language] {
        &[
            Language::English,
            Language::French,
            Language::German,
            Language::Spanish,
        ]
    }

    /// ISO 639-1 code as used in config.toml.
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::French => "fr",
            Self::German => "de",
            Self::Spanish => "es",
        }
    }

    fn chrono_locale(self) -> Locale {
        match self {
            Self::English => Locale::en_US,
            Self::French => Locale::fr_FR,
            Self::German => Locale::de_DE,
            Self::Spanish => Locale::es_ES,
        }
    }

    /// Label of the "select all" sentinel.
    pub fn all_label(self) -> &'static str {
        match self {
            Self::English => "(Select all)",
            Self::French => "(Sélectionner tout)",
            Self::German => "(Alle auswählen)",
            Self::Spanish => "(Seleccionar todo)",
        }
    }

    /// Label of the blank sentinel.
    pub fn empty_label(self) -> &'static str {
        match self {
            Self::English => "(Blank)",
            Self::French => "(Vide)",
            Self::German => "(Leer)",
            Self::Spanish => "(Vacío)",
        }
    }

    pub fn true_label(self) -> &'static str {
        match self {
            Self::English => "Checked",
            Self::French => "Coché",
            Self::German => "Ausgewählt",
            Self::Spanish => "Seleccionado",
        }
    }

    pub fn false_label(self) -> &'static str {
        match self {
            Self::English => "Unchecked",
            Self::French => "Décoché",
            Self::German => "Nicht ausgewählt",
            Self::Spanish => "No seleccionado",
        }
    }

    /// Blank label for boolean columns.
    pub fn indeterminate_label(self) -> &'static str {
        match self {
            Self::English => "Indeterminate",
            Self::French => "Indéterminé",
            Self::German => "Unbestimmt",
            Self::Spanish => "Indeterminado",
        }
    }

    /// Full month name for `month` (1-12); falls back to the number.
    pub fn month_name(self, year: i32, month: u32) -> String {
        match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(date) => {
                let at = DateTime::<Utc>::from_naive_utc_and_offset(
                    date.and_time(NaiveTime::MIN),
                    Utc,
                );
                at.format_localized("%B", self.chrono_locale()).to_string()
            }
            None => format!("{month:02}"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Language::all()
            .iter()
            .copied()
            .find(|l| l.code() == lower)
            .ok_or_else(|| format!("unsupported language '{s}'"))
    }
}

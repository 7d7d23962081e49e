//! Built-in message catalog for report titles and column headers

use tracing::warn;

/// Language used when none is requested or the requested one is unknown
pub const DEFAULT_LANGUAGE: &str = "pt";

const PT: &[(&str, &str)] = &[
    ("report.title", "Relatório de desempenho"),
    ("column.domain", "Placa"),
    ("column.name", "Nome"),
    ("column.lastname", "Sobrenome"),
    ("column.name_lastname", "Motorista"),
    ("column.driver", "Motorista"),
    ("column.holder", "Veículo"),
    ("column.travel_distance", "Distância percorrida (km)"),
    ("column.travel_time", "Horas de uso"),
    ("column.ralenti_time", "Tempo em marcha lenta"),
];

const ES: &[(&str, &str)] = &[
    ("report.title", "Reporte de desempeño"),
    ("column.domain", "Dominio"),
    ("column.name", "Nombre"),
    ("column.lastname", "Apellido"),
    ("column.name_lastname", "Conductor"),
    ("column.driver", "Conductor"),
    ("column.holder", "Vehículo"),
    ("column.travel_distance", "Distancia recorrida (km)"),
    ("column.travel_time", "Horas de uso"),
    ("column.ralenti_time", "Tiempo en ralentí"),
];

const EN: &[(&str, &str)] = &[
    ("report.title", "Performance report"),
    ("column.domain", "Plate"),
    ("column.name", "Name"),
    ("column.lastname", "Last name"),
    ("column.name_lastname", "Driver"),
    ("column.driver", "Driver"),
    ("column.holder", "Vehicle"),
    ("column.travel_distance", "Distance traveled (km)"),
    ("column.travel_time", "Usage hours"),
    ("column.ralenti_time", "Idle time"),
];

/// Message lookup for one language
#[derive(Clone, Debug)]
pub struct Messages {
    language: &'static str,
    table: &'static [(&'static str, &'static str)],
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE,
            table: PT,
        }
    }
}

impl Messages {
    /// Catalog for `language`, falling back to the default language
    pub fn for_language(language: &str) -> Self {
        let (language, table) = match language.to_ascii_lowercase().as_str() {
            "pt" => ("pt", PT),
            "es" => ("es", ES),
            "en" => ("en", EN),
            other => {
                warn!(language = other, fallback = DEFAULT_LANGUAGE, "unknown language");
                return Self::default();
            }
        };
        Self { language, table }
    }

    pub fn language(&self) -> &'static str {
        self.language
    }

    /// Translated message, or the key itself when untranslated
    pub fn get<'k>(&self, key: &'k str) -> &'k str {
        self.table
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(key, |(_, message)| *message)
    }

    pub fn report_title(&self) -> &'static str {
        self.get("report.title")
    }

    /// Header label for a data field without an explicit label
    pub fn column_label(&self, data_field: &str) -> String {
        let key = format!("column.{}", to_snake_case(data_field));
        self.get(&key).to_string()
    }
}

/// `travelDistance` -> `travel_distance`, `{name} {lastname}` -> `name_lastname`
pub fn to_snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    let mut pending_separator = false;
    for c in field.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && !out.is_empty() {
                pending_separator = true;
            }
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("travelDistance"), "travel_distance");
        assert_eq!(to_snake_case("domain"), "domain");
        assert_eq!(to_snake_case("{name} {lastname}"), "name_lastname");
        assert_eq!(to_snake_case("fleet_id"), "fleet_id");
    }

    #[test]
    fn known_labels_are_translated() {
        let pt = Messages::for_language("pt");
        assert_eq!(pt.column_label("travelTime"), "Horas de uso");
        let en = Messages::for_language("EN");
        assert_eq!(en.column_label("ralentiTime"), "Idle time");
        assert_eq!(en.column_label("{name} {lastname}"), "Driver");
    }

    #[test]
    fn unknown_keys_fall_back_to_key() {
        let messages = Messages::default();
        assert_eq!(messages.column_label("fuelUsed"), "column.fuel_used");
    }

    #[test]
    fn unknown_language_falls_back_to_default() {
        let messages = Messages::for_language("klingon");
        assert_eq!(messages.language(), DEFAULT_LANGUAGE);
        assert_eq!(messages.report_title(), "Relatório de desempenho");
    }
}

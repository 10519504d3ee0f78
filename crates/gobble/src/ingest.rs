//! Catalog ingestion: turns raw geo-tagged records into catalog entries.
//!
//! Each record carries an HTML fragment whose `<td>` cells hold the fields at
//! fixed ordinal positions. Cells are read by position, never by label, so a
//! reordered source table silently produces wrong entries. The tests below pin
//! the mapping.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::types::{Catalog, GobbleError, GobbleResult};

/// Ordinal cell positions inside a record's description table.
pub mod cells {
    pub const COMPANY: usize = 0;
    pub const BLOCK: usize = 1;
    pub const STREET: usize = 2;
    pub const UNIT: usize = 3;
    pub const POSTAL: usize = 4;
    pub const NAME: usize = 6;
    pub const LEVEL: usize = 7;

    /// Minimum number of cells a description must have.
    pub const REQUIRED: usize = LEVEL + 1;
}

/// Records between progress log lines.
pub const PROGRESS_EVERY: usize = 1000;

/// GeoJSON-like payload served by the dataset download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// One raw record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(rename = "Description")]
    pub description: String,
}

impl Feature {
    /// Wrap a description fragment as a feature.
    pub fn from_description(description: impl Into<String>) -> Self {
        Self {
            properties: FeatureProperties {
                description: description.into(),
            },
        }
    }
}

/// Fields extracted from one description, before address assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFields {
    pub company: String,
    pub name: String,
    pub block: String,
    pub street: String,
    pub unit: String,
    pub postal: String,
    pub level: String,
}

impl RecordFields {
    /// Normalized single-line address.
    ///
    /// `"{block} {street} #{level}-{unit}, SINGAPORE {postal}"`, with the
    /// `#level-unit` part only when both are present.
    pub fn address(&self) -> String {
        let unit = zero_pad(&self.unit, 10, 2);
        let level = zero_pad(&self.level, 10, 2);
        let postal = zero_pad(&self.postal, 100_000, 6);

        let level_unit = if !level.is_empty() && !unit.is_empty() {
            format!(" #{level}-{unit}")
        } else {
            String::new()
        };

        format!(
            "{} {}{level_unit}, SINGAPORE {postal}",
            self.block, self.street
        )
    }
}

/// Left-pad a purely numeric value below `threshold` with zeros to `width`.
/// Anything else is returned unchanged.
pub fn zero_pad(value: &str, threshold: u64, width: usize) -> String {
    let numeric = !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());
    match value.parse::<u64>() {
        Ok(n) if numeric && n < threshold => format!("{value:0>width$}"),
        _ => value.to_string(),
    }
}

/// Extracts ordinal `<td>` cells from description fragments.
pub struct DescriptionParser {
    cell: Selector,
}

impl DescriptionParser {
    pub fn new() -> GobbleResult<Self> {
        let cell = Selector::parse("td")
            .map_err(|e| GobbleError::InvalidInput(format!("Bad cell selector: {e:?}")))?;
        Ok(Self { cell })
    }

    /// Text content of every `<td>` in document order.
    pub fn cell_texts(&self, fragment: &str) -> Vec<String> {
        let html = Html::parse_fragment(fragment);
        html.select(&self.cell)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect()
    }

    /// Parse the record at `position` into its fields.
    pub fn parse(&self, position: usize, fragment: &str) -> GobbleResult<RecordFields> {
        let texts = self.cell_texts(fragment);
        if texts.len() < cells::REQUIRED {
            return Err(GobbleError::MalformedRecord {
                position,
                reason: format!(
                    "expected at least {} table cells, found {}",
                    cells::REQUIRED,
                    texts.len()
                ),
            });
        }

        Ok(RecordFields {
            company: texts[cells::COMPANY].clone(),
            name: texts[cells::NAME].clone(),
            block: texts[cells::BLOCK].clone(),
            street: texts[cells::STREET].clone(),
            unit: texts[cells::UNIT].clone(),
            postal: texts[cells::POSTAL].clone(),
            level: texts[cells::LEVEL].clone(),
        })
    }
}

/// Build a catalog from raw features. Input order assigns indices.
///
/// Any malformed record aborts the whole build; no partial catalog is returned.
pub fn build_catalog(features: &[Feature]) -> GobbleResult<Catalog> {
    let parser = DescriptionParser::new()?;
    let total = features.len();
    let mut rows = Vec::with_capacity(total);

    for (position, feature) in features.iter().enumerate() {
        let fields = parser.parse(position, &feature.properties.description)?;
        let address = fields.address();
        rows.push((fields.company, fields.name, address));

        if (position + 1) % PROGRESS_EVERY == 0 {
            tracing::info!("Records parsed: {}/{}", position + 1, total);
        }
    }

    tracing::info!("Built catalog with {} entries", rows.len());
    Ok(Catalog::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Description table in the source layout. Cell 5 is not used.
    fn description(
        company: &str,
        block: &str,
        street: &str,
        unit: &str,
        postal: &str,
        name: &str,
        level: &str,
    ) -> String {
        let cells = [company, block, street, unit, postal, "IGNORED", name, level];
        let mut html = String::from("<center><table>");
        for (i, value) in cells.iter().enumerate() {
            html.push_str(&format!("<tr><th>FIELD_{i}</th><td>{value}</td></tr>"));
        }
        html.push_str("</table></center>");
        html
    }

    #[test]
    fn test_zero_pad_unit_and_level() {
        assert_eq!(zero_pad("7", 10, 2), "07");
        assert_eq!(zero_pad("10", 10, 2), "10");
        assert_eq!(zero_pad("B1", 10, 2), "B1");
        assert_eq!(zero_pad("", 10, 2), "");
    }

    #[test]
    fn test_zero_pad_postal() {
        assert_eq!(zero_pad("1234", 100_000, 6), "001234");
        assert_eq!(zero_pad("12345", 100_000, 6), "012345");
        assert_eq!(zero_pad("123456", 100_000, 6), "123456");
    }

    #[test]
    fn test_ordinal_cell_mapping() {
        let parser = DescriptionParser::new().unwrap();
        let html = description("ACME PTE LTD", "10", "ORCHARD RD", "5", "238826", "ACME CAFE", "3");
        let fields = parser.parse(0, &html).unwrap();

        assert_eq!(fields.company, "ACME PTE LTD");
        assert_eq!(fields.block, "10");
        assert_eq!(fields.street, "ORCHARD RD");
        assert_eq!(fields.unit, "5");
        assert_eq!(fields.postal, "238826");
        assert_eq!(fields.name, "ACME CAFE");
        assert_eq!(fields.level, "3");
    }

    #[test]
    fn test_address_with_level_and_unit() {
        let parser = DescriptionParser::new().unwrap();
        let html = description("C", "10", "ORCHARD RD", "5", "238826", "N", "3");
        let fields = parser.parse(0, &html).unwrap();
        assert_eq!(fields.address(), "10 ORCHARD RD #03-05, SINGAPORE 238826");
    }

    #[test]
    fn test_address_without_level_omits_unit_fragment() {
        let parser = DescriptionParser::new().unwrap();
        let html = description("C", "2", "BEACH RD", "7", "1234", "N", "");
        let fields = parser.parse(0, &html).unwrap();
        assert_eq!(fields.address(), "2 BEACH RD, SINGAPORE 001234");
    }

    #[test]
    fn test_build_three_record_catalog() {
        let features = vec![
            Feature::from_description(description("A CO", "1", "ALPHA ST", "7", "1234", "ALPHA", "2")),
            Feature::from_description(description("B CO", "22", "BETA AVE", "", "567890", "BETA", "")),
            Feature::from_description(description("C CO", "3A", "GAMMA LN", "12", "99999", "GAMMA", "B1")),
        ];

        let catalog = build_catalog(&features).unwrap();
        assert_eq!(catalog.len(), 3);

        let a = catalog.get(0).unwrap();
        assert_eq!(a.index, 0);
        assert_eq!(a.company, "A CO");
        assert_eq!(a.name, "ALPHA");
        assert_eq!(a.address, "1 ALPHA ST #02-07, SINGAPORE 001234");
        assert!(a.address.contains("-07"));

        assert_eq!(catalog.get(1).unwrap().address, "22 BETA AVE, SINGAPORE 567890");
        assert_eq!(
            catalog.get(2).unwrap().address,
            "3A GAMMA LN #B1-12, SINGAPORE 099999"
        );
    }

    #[test]
    fn test_short_description_aborts_build() {
        let features = vec![
            Feature::from_description(description("A", "1", "S", "1", "1", "N", "1")),
            Feature::from_description("<table><tr><td>only one</td></tr></table>"),
        ];

        match build_catalog(&features) {
            Err(GobbleError::MalformedRecord { position, .. }) => assert_eq!(position, 1),
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn test_feature_collection_deserializes() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"Name":"kml_1","Description":"<table><tr><th>A</th><td> x </td></tr></table>"},"geometry":null}
        ]}"#;
        let fc: FeatureCollection = serde_json::from_str(json).unwrap();
        assert_eq!(fc.features.len(), 1);

        let parser = DescriptionParser::new().unwrap();
        assert_eq!(parser.cell_texts(&fc.features[0].properties.description), vec!["x"]);
    }
}

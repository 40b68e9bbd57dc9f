use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

/// Embedded CSV data for all regions (federal states plus the national code).
pub static CSV_OBJECT: &str = include_str!("../../fixtures/regions.csv");

/// Region code that stands for the whole country.
pub const NATIONAL_CODE: &str = "AT";

/// A reporting region as used in the `BUNDESLAND` column.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

impl Region {
    /// Get region vector from the embedded CSV.
    pub fn get_region_vector() -> Vec<Region> {
        Region::parse_region_csv(CSV_OBJECT).unwrap_or_default()
    }

    /// Parse a CSV string of region data into a vector of Regions.
    ///
    /// Expected CSV columns: code, name
    pub fn parse_region_csv(csv_object: &str) -> Result<Vec<Region>, csv::Error> {
        let mut region_list: Vec<Region> = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .from_reader(csv_object.as_bytes());
        for row in rdr.records() {
            let rho = row?;
            let code = rho.get(0).unwrap_or_default().trim();
            if code.is_empty() {
                continue;
            }
            region_list.push(Region {
                code: code.to_string(),
                name: rho.get(1).unwrap_or(code).trim().to_string(),
            });
        }
        Ok(region_list)
    }

    /// Display name for a region code; unknown codes are shown as-is.
    pub fn display_name(code: &str) -> String {
        Region::get_region_vector()
            .into_iter()
            .find(|region| region.code == code)
            .map(|region| region.name)
            .unwrap_or_else(|| code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::region::Region;

    #[test]
    fn test_region_vector() {
        let regions: Vec<Region> = Region::get_region_vector();
        assert_eq!(regions.len(), 10);
        assert_eq!(regions[0].code, "AT");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Region::display_name("W"), "Wien");
        assert_eq!(Region::display_name("XX"), "XX");
    }

    #[test]
    fn test_parse_skips_blank_codes() {
        let regions = Region::parse_region_csv("CODE,NAME\n,Nowhere\nT,Tirol\n").unwrap();
        assert_eq!(regions, vec![Region { code: "T".into(), name: "Tirol".into() }]);
    }
}

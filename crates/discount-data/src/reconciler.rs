//! Header reconciliation: maps the free-form column headers of an insurer
//! sheet onto the canonical discount schema.
//!
//! Matching is driven by the [`FIELD_RULES`] table rather than branching
//! code, so a new header variant is one more [`HeaderMatcher`] entry.

use serde::Serialize;
use tracing::warn;

use discount_core::data_processors::HeaderNormalizer;
use discount_core::models::{RawTable, DISCOUNT_COLUMN};

// ── Canonical schema ──────────────────────────────────────────────────────────

/// A column of the normalized schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    ChiLocation,
    ServiceType,
    Discount,
    DiscountBand,
}

impl CanonicalField {
    /// Canonical column name. The discount column keeps its legacy spelling.
    pub fn column_name(self) -> &'static str {
        match self {
            CanonicalField::ChiLocation => "chi_location",
            CanonicalField::ServiceType => "service_type",
            CanonicalField::Discount => DISCOUNT_COLUMN,
            CanonicalField::DiscountBand => "discount_band",
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// Predicate over a normalized (trimmed, lowercased) header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMatcher {
    /// Header equals the string.
    Exact(&'static str),
    /// Header contains every keyword, in any position.
    ContainsAll(&'static [&'static str]),
}

impl HeaderMatcher {
    pub fn matches(&self, header: &str) -> bool {
        match self {
            HeaderMatcher::Exact(s) => header == *s,
            HeaderMatcher::ContainsAll(keywords) => keywords.iter().all(|k| header.contains(k)),
        }
    }
}

/// Ordered candidate matchers for one canonical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: CanonicalField,
    pub matchers: &'static [HeaderMatcher],
}

/// Rules in resolution order.
///
/// The order is also the collision precedence: a header claimed by an earlier
/// field is not eligible for a later one. Discount resolves last because its
/// `"disc"` fallback is the least specific predicate in the table; its exact
/// spellings cannot satisfy any earlier rule.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: CanonicalField::ChiLocation,
        matchers: &[
            HeaderMatcher::ContainsAll(&["chilocation"]),
            HeaderMatcher::ContainsAll(&["chi", "location"]),
        ],
    },
    FieldRule {
        field: CanonicalField::ServiceType,
        matchers: &[
            HeaderMatcher::ContainsAll(&["servicetype"]),
            HeaderMatcher::ContainsAll(&["service", "type"]),
        ],
    },
    FieldRule {
        field: CanonicalField::DiscountBand,
        matchers: &[HeaderMatcher::ContainsAll(&["discount", "band"])],
    },
    FieldRule {
        field: CanonicalField::Discount,
        matchers: &[
            HeaderMatcher::Exact("dicount"),
            HeaderMatcher::Exact("discount"),
            HeaderMatcher::ContainsAll(&["disc"]),
        ],
    },
];

// ── Mapping ───────────────────────────────────────────────────────────────────

/// A raw column chosen for a canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedColumn {
    /// Position in the raw header row.
    pub index: usize,
    /// Header exactly as it appeared in the sheet.
    pub header: String,
}

/// A header that satisfied a field's rule but was already claimed by a field
/// with higher precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCollision {
    pub header: String,
    pub claimed_by: CanonicalField,
    pub wanted_by: CanonicalField,
}

/// Result of reconciling one table's headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub chi_location: Option<MatchedColumn>,
    pub service_type: Option<MatchedColumn>,
    pub discount: Option<MatchedColumn>,
    pub discount_band: Option<MatchedColumn>,
    /// Data-quality warnings raised while resolving.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<HeaderCollision>,
}

impl ColumnMapping {
    pub fn get(&self, field: CanonicalField) -> Option<&MatchedColumn> {
        match field {
            CanonicalField::ChiLocation => self.chi_location.as_ref(),
            CanonicalField::ServiceType => self.service_type.as_ref(),
            CanonicalField::Discount => self.discount.as_ref(),
            CanonicalField::DiscountBand => self.discount_band.as_ref(),
        }
    }

    /// Column index for `field`, if matched.
    pub fn index_of(&self, field: CanonicalField) -> Option<usize> {
        self.get(field).map(|c| c.index)
    }

    fn set(&mut self, field: CanonicalField, column: MatchedColumn) {
        let slot = match field {
            CanonicalField::ChiLocation => &mut self.chi_location,
            CanonicalField::ServiceType => &mut self.service_type,
            CanonicalField::Discount => &mut self.discount,
            CanonicalField::DiscountBand => &mut self.discount_band,
        };
        *slot = Some(column);
    }
}

// ── SchemaReconciler ──────────────────────────────────────────────────────────

/// Stateless header → canonical field resolver.
pub struct SchemaReconciler;

impl SchemaReconciler {
    /// Reconcile the headers of `table`.
    pub fn reconcile(table: &RawTable) -> ColumnMapping {
        Self::reconcile_headers(&table.headers)
    }

    /// Reconcile a raw header row.
    ///
    /// Each field takes the first header matched by its highest-priority
    /// matcher that matches anything; headers are scanned in column order.
    pub fn reconcile_headers<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| HeaderNormalizer::normalize(h.as_ref()))
            .collect();

        let mut claimed: Vec<Option<CanonicalField>> = vec![None; normalized.len()];
        let mut mapping = ColumnMapping::default();

        for rule in FIELD_RULES {
            let found = Self::resolve_field(rule, &normalized, &claimed, headers, &mut mapping.collisions);
            if let Some(index) = found {
                claimed[index] = Some(rule.field);
                mapping.set(
                    rule.field,
                    MatchedColumn {
                        index,
                        header: headers[index].as_ref().to_string(),
                    },
                );
            }
        }

        mapping
    }

    fn resolve_field<S: AsRef<str>>(
        rule: &FieldRule,
        normalized: &[String],
        claimed: &[Option<CanonicalField>],
        headers: &[S],
        collisions: &mut Vec<HeaderCollision>,
    ) -> Option<usize> {
        for matcher in rule.matchers {
            for (index, header) in normalized.iter().enumerate() {
                if !matcher.matches(header) {
                    continue;
                }
                match claimed[index] {
                    None => return Some(index),
                    Some(owner) => {
                        let collision = HeaderCollision {
                            header: headers[index].as_ref().to_string(),
                            claimed_by: owner,
                            wanted_by: rule.field,
                        };
                        if !collisions.contains(&collision) {
                            warn!(
                                header = %collision.header,
                                claimed_by = %owner,
                                wanted_by = %rule.field,
                                "header matches more than one canonical field; keeping the earlier claim"
                            );
                            collisions.push(collision);
                        }
                    }
                }
            }
        }
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of(mapping: &ColumnMapping, field: CanonicalField) -> Option<&str> {
        mapping.get(field).map(|c| c.header.as_str())
    }

    // ── canonical headers ─────────────────────────────────────────────────────

    #[test]
    fn test_canonical_headers_map_to_themselves() {
        let headers = ["chi_location", "service_type", "dicount", "discount_band"];
        let mapping = SchemaReconciler::reconcile_headers(&headers);

        assert_eq!(mapping.index_of(CanonicalField::ChiLocation), Some(0));
        assert_eq!(mapping.index_of(CanonicalField::ServiceType), Some(1));
        assert_eq!(mapping.index_of(CanonicalField::Discount), Some(2));
        assert_eq!(mapping.index_of(CanonicalField::DiscountBand), Some(3));
        assert!(mapping.collisions.is_empty());
    }

    // ── chi_location ──────────────────────────────────────────────────────────

    #[test]
    fn test_chi_location_case_and_whitespace_insensitive() {
        for header in [" Chi_Location ", "CHILOCATION", "chi location"] {
            let mapping = SchemaReconciler::reconcile_headers(&[header, "Discount"]);
            assert_eq!(
                header_of(&mapping, CanonicalField::ChiLocation),
                Some(header),
                "header {header:?} should map to chi_location"
            );
        }
    }

    #[test]
    fn test_chi_location_prefers_concatenated_spelling() {
        let mapping = SchemaReconciler::reconcile_headers(&["CHI Region Location", "ChiLocation"]);
        assert_eq!(header_of(&mapping, CanonicalField::ChiLocation), Some("ChiLocation"));
    }

    #[test]
    fn test_chi_location_keywords_need_not_be_adjacent() {
        let mapping = SchemaReconciler::reconcile_headers(&["Location (CHI)"]);
        assert_eq!(header_of(&mapping, CanonicalField::ChiLocation), Some("Location (CHI)"));
    }

    // ── service_type ──────────────────────────────────────────────────────────

    #[test]
    fn test_service_type_variants() {
        for header in ["ServiceType", "Service Type", "type of service"] {
            let mapping = SchemaReconciler::reconcile_headers(&[header]);
            assert_eq!(header_of(&mapping, CanonicalField::ServiceType), Some(header));
        }
    }

    #[test]
    fn test_service_without_type_is_absent() {
        let mapping = SchemaReconciler::reconcile_headers(&["Service"]);
        assert!(mapping.service_type.is_none());
    }

    // ── discount ──────────────────────────────────────────────────────────────

    #[test]
    fn test_discount_legacy_spelling_wins_over_correct_spelling() {
        let mapping = SchemaReconciler::reconcile_headers(&["Discount", "Dicount"]);
        assert_eq!(header_of(&mapping, CanonicalField::Discount), Some("Dicount"));
    }

    #[test]
    fn test_discount_exact_match_wins_over_earlier_substring() {
        let mapping = SchemaReconciler::reconcile_headers(&["Disc Code", "Discount"]);
        assert_eq!(header_of(&mapping, CanonicalField::Discount), Some("Discount"));
    }

    #[test]
    fn test_discount_substring_fallback_takes_first() {
        let mapping = SchemaReconciler::reconcile_headers(&["Clinic", "Discount Rate", "Disc 2"]);
        assert_eq!(header_of(&mapping, CanonicalField::Discount), Some("Discount Rate"));
    }

    #[test]
    fn test_discount_absent_without_disc_header() {
        let mapping = SchemaReconciler::reconcile_headers(&["Clinic", "Rate", "Band"]);
        assert!(mapping.discount.is_none());
    }

    // ── discount_band ─────────────────────────────────────────────────────────

    #[test]
    fn test_discount_band_variants() {
        for header in ["Discount Band", "discountband", "Band of discount"] {
            let mapping = SchemaReconciler::reconcile_headers(&["Discount", header]);
            assert_eq!(header_of(&mapping, CanonicalField::DiscountBand), Some(header));
            assert_eq!(header_of(&mapping, CanonicalField::Discount), Some("Discount"));
        }
    }

    // ── collisions ────────────────────────────────────────────────────────────

    #[test]
    fn test_band_header_is_not_reused_as_discount() {
        let mapping = SchemaReconciler::reconcile_headers(&["Discount Band"]);

        assert_eq!(header_of(&mapping, CanonicalField::DiscountBand), Some("Discount Band"));
        assert!(mapping.discount.is_none());
        assert_eq!(
            mapping.collisions,
            vec![HeaderCollision {
                header: "Discount Band".to_string(),
                claimed_by: CanonicalField::DiscountBand,
                wanted_by: CanonicalField::Discount,
            }]
        );
    }

    #[test]
    fn test_substring_fallback_skips_claimed_band_header() {
        let mapping = SchemaReconciler::reconcile_headers(&["Discount Band", "Disc %"]);

        assert_eq!(header_of(&mapping, CanonicalField::DiscountBand), Some("Discount Band"));
        assert_eq!(header_of(&mapping, CanonicalField::Discount), Some("Disc %"));
        assert_eq!(mapping.collisions.len(), 1);
    }

    #[test]
    fn test_unrelated_headers_leave_every_field_absent() {
        let mapping = SchemaReconciler::reconcile_headers(&["Clinic Name", "Address"]);
        assert_eq!(mapping, ColumnMapping::default());
    }

    #[test]
    fn test_reconcile_uses_table_headers() {
        let table = RawTable::new(vec!["Chi Location".into(), "Discount".into()], vec![]);
        let mapping = SchemaReconciler::reconcile(&table);
        assert_eq!(mapping.index_of(CanonicalField::ChiLocation), Some(0));
        assert_eq!(mapping.index_of(CanonicalField::Discount), Some(1));
    }

    #[test]
    fn test_column_names() {
        assert_eq!(CanonicalField::Discount.column_name(), "dicount");
        assert_eq!(CanonicalField::DiscountBand.to_string(), "discount_band");
    }
}

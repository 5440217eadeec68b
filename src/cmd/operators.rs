use crate::reports;
use geneforge::chromosome::{ComparatorKind, RealVector};
use geneforge::operators::OperatorRegistry;
use strum::IntoEnumIterator;

pub fn run() {
    // Operator names do not depend on the chromosome type.
    let registry = OperatorRegistry::<RealVector>::with_defaults();
    let mut entries = registry.names();
    entries.extend(ComparatorKind::iter().map(|k| ("comparator", k.to_string())));
    reports::print_operator_table(&entries);
}

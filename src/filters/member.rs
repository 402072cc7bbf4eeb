//! Membership-shipping-only filter (Amazon Prime).

use super::Filter;
use crate::models::ProductRecord;

/// Keeps only products eligible for the retailer's membership shipping.
#[derive(Default)]
pub struct MemberFilter;

impl MemberFilter {
    pub fn new() -> Self {
        Self
    }
}

impl Filter for MemberFilter {
    fn matches(&self, product: &ProductRecord) -> bool {
        product.member_eligible
    }

    fn description(&self) -> String {
        "Prime only".to_string()
    }
}

/// Subscription packages understood by the checkout endpoint. The wire value
/// is the package length in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PremiumPlan {
    Monthly,
    SixMonths,
    Yearly,
}

impl PremiumPlan {
    pub fn days(&self) -> u32 {
        match self {
            PremiumPlan::Monthly => 30,
            PremiumPlan::SixMonths => 180,
            PremiumPlan::Yearly => 365,
        }
    }
}

use super::narrative::product_list_literal;
use super::{CoverageTarget, EducationLevel, Recommendation, RiskProfile, RuleResult};
use crate::domain::product::ProductRecommendation;

/// Oldest child age for which education planning is still recommended.
pub const EDUCATION_MAX_CHILD_AGE: u32 = 10;

const CRITICAL_ILLNESS_RIDER: &str = "Sequis Q Early Payout Critical Illness Plus Rider";
const MEDCARE_SHIELD_RIDER: &str = "Sequis Q Infinite Medcare Shield Rider";
const HEALTH_PROTECTION: &str = "Sequis Health Protection";
const EDUPLAN_INSURANCE: &str = "Sequis EduPlan Insurance";
const EDUPLAN_ASSURANCE: &str = "Asuransi Sequis EduPlan";
const HERITAGE_INCOME_PROTECTOR: &str = "Sequis Q Heritage Income Protector";
const PATH_PROTECTOR: &str = "SequislinQ Path Protector";

pub fn health_insurance(target: CoverageTarget, needs_critical_illness_cover: bool) -> RuleResult {
    let products = if needs_critical_illness_cover {
        vec![ProductRecommendation::new(
            CRITICAL_ILLNESS_RIDER,
            "Comprehensive protection for up to 120 critical illness conditions, paid out from the early stage.",
        )]
    } else {
        vec![
            ProductRecommendation::new(
                MEDCARE_SHIELD_RIDER,
                "Premium health protection with an annual limit of up to IDR 90 billion.",
            ),
            ProductRecommendation::new(
                HEALTH_PROTECTION,
                "Inpatient and surgical benefits. Suited for basic protection.",
            ),
        ]
    };

    let narrative = format!(
        "Based on your need for {target} coverage, here are the recommended products: {}",
        product_list_literal(&products)
    );
    RuleResult::success(Recommendation::Narrated { narrative, products })
}

pub fn education_insurance(child_age: u32, education_level: EducationLevel) -> RuleResult {
    if child_age > EDUCATION_MAX_CHILD_AGE {
        return RuleResult::failure(
            "Education insurance planning should ideally start before the child turns 10 for the best results.",
        );
    }

    let products = vec![
        ProductRecommendation::new(
            EDUPLAN_INSURANCE,
            format!(
                "Offers a flexible policy term and a cash value that can fund {education_level} education."
            ),
        ),
        ProductRecommendation::new(
            EDUPLAN_ASSURANCE,
            "Affordable premiums with a guaranteed education fund for the future of your child.",
        ),
    ];

    let narrative = format!(
        "For a {child_age}-year-old child planning for {education_level} education, here are the recommendations: {}",
        product_list_literal(&products)
    );
    RuleResult::success(Recommendation::Narrated { narrative, products })
}

pub fn retirement_fund(current_age: u32, target_retirement_age: u32) -> RuleResult {
    if current_age >= target_retirement_age {
        return RuleResult::failure("Current age must be less than the target retirement age.");
    }

    RuleResult::success(Recommendation::Single(ProductRecommendation::new(
        HERITAGE_INCOME_PROTECTOR,
        format!(
            "Lifelong protection with a retirement fund benefit that can be drawn from age {target_retirement_age} to secure a prosperous old age."
        ),
    )))
}

pub fn investment_insurance(risk_profile: RiskProfile) -> RuleResult {
    RuleResult::success(Recommendation::Single(ProductRecommendation::new(
        PATH_PROTECTOR,
        format!(
            "Combines life insurance with investment. For a {risk_profile} risk profile you can choose the fund allocation that maximizes potential returns while staying protected."
        ),
    )))
}

#[cfg(test)]
mod tests {
    use super::{education_insurance, health_insurance, investment_insurance, retirement_fund};
    use crate::recommendation::{
        CoverageTarget, EducationLevel, Recommendation, RiskProfile, RuleResult,
    };

    fn names(result: &RuleResult) -> Vec<&str> {
        result.products().iter().map(|product| product.name.as_str()).collect()
    }

    #[test]
    fn health_without_critical_illness_returns_two_products() {
        let result = health_insurance(CoverageTarget::Family, false);

        assert!(result.is_success());
        assert_eq!(
            names(&result),
            vec!["Sequis Q Infinite Medcare Shield Rider", "Sequis Health Protection"]
        );
        assert!(result.to_text().contains("family coverage"));
    }

    #[test]
    fn health_with_critical_illness_returns_single_rider() {
        let result = health_insurance(CoverageTarget::Individual, true);

        assert_eq!(names(&result), vec!["Sequis Q Early Payout Critical Illness Plus Rider"]);
        assert!(result.products()[0].description.contains("120"));
        assert!(result.to_text().contains("individual"));
    }

    #[test]
    fn health_rule_is_idempotent() {
        for target in CoverageTarget::ALL {
            for critical in [false, true] {
                assert_eq!(health_insurance(target, critical), health_insurance(target, critical));
            }
        }
    }

    #[test]
    fn education_for_young_child_interpolates_level() {
        let result = education_insurance(5, EducationLevel::Elementary);

        assert!(result.is_success());
        assert_eq!(result.products().len(), 2);
        assert!(result
            .products()
            .iter()
            .any(|product| product.description.contains("elementary")));
        assert!(result.to_text().starts_with("For a 5-year-old child"));
    }

    #[test]
    fn education_age_threshold_is_inclusive_of_ten() {
        assert!(education_insurance(10, EducationLevel::University).is_success());

        let result = education_insurance(11, EducationLevel::High);
        assert!(!result.is_success());
        assert!(result.error_message().unwrap_or_default().contains("before the child turns 10"));
    }

    #[test]
    fn retirement_rejects_current_age_at_or_past_target() {
        let result = retirement_fund(40, 35);
        assert_eq!(
            result.error_message(),
            Some("Current age must be less than the target retirement age.")
        );
        assert!(!retirement_fund(55, 55).is_success());
    }

    #[test]
    fn retirement_interpolates_target_age() {
        let result = retirement_fund(30, 58);

        assert!(matches!(
            &result,
            RuleResult::Success { recommendation: Recommendation::Single(product) }
                if product.description.contains("age 58")
        ));
    }

    #[test]
    fn investment_always_succeeds_with_profile_in_description() {
        for profile in RiskProfile::ALL {
            let result = investment_insurance(profile);
            assert!(result.is_success());
            assert_eq!(names(&result), vec!["SequislinQ Path Protector"]);
            assert!(result.products()[0].description.contains(profile.as_str()));
        }
    }

    #[test]
    fn every_valid_input_succeeds_outside_age_failures() {
        for level in EducationLevel::ALL {
            for age in 0..=10 {
                assert!(education_insurance(age, level).is_success());
            }
        }
        for current in 18..60 {
            assert!(retirement_fund(current, 60).is_success());
        }
    }
}

//! Completeness-based confidence scoring for extracted leads.
//!
//! The score measures how much contact and leadership data a record carries,
//! not whether that data is accurate.

use leadmatrix_shared::{Business, is_present};

/// Score every record starts from.
pub const BASE_SCORE: u8 = 40;

/// Upper bound of any score.
pub const MAX_SCORE: u8 = 100;

/// Scores strictly above this are reported as high fidelity.
pub const HIGH_FIDELITY_THRESHOLD: u8 = 80;

/// One independent bonus applied on top of [`BASE_SCORE`].
#[derive(Debug, Clone, Copy)]
pub struct FidelityBonus {
    pub label: &'static str,
    pub points: u8,
    pub applies: fn(&Business) -> bool,
}

/// The bonuses used by [`fidelity_score`].
pub const FIDELITY_BONUSES: &[FidelityBonus] = &[
    FidelityBonus {
        label: "corporate email",
        points: 20,
        applies: has_email,
    },
    FidelityBonus {
        label: "linkedin profile",
        points: 15,
        applies: has_linkedin,
    },
    FidelityBonus {
        label: "named leader",
        points: 15,
        applies: has_leader,
    },
    FidelityBonus {
        label: "phone number",
        points: 10,
        applies: has_phone,
    },
];

fn has_email(biz: &Business) -> bool {
    is_present(&biz.email) && biz.email.contains('@')
}

fn has_linkedin(biz: &Business) -> bool {
    let url = &biz.social_footprint.linkedin;
    is_present(url) && url.contains("linkedin.com")
}

fn has_leader(biz: &Business) -> bool {
    is_present(&biz.leader_name) && biz.leader_name.chars().count() > 3
}

fn has_phone(biz: &Business) -> bool {
    is_present(&biz.phone) && biz.phone.chars().count() > 5
}

/// Confidence score in `0..=100` for one record.
pub fn fidelity_score(biz: &Business) -> u8 {
    score_with(biz, FIDELITY_BONUSES)
}

/// Score against an arbitrary bonus table, capped at [`MAX_SCORE`].
pub fn score_with(biz: &Business, bonuses: &[FidelityBonus]) -> u8 {
    let total = bonuses
        .iter()
        .filter(|bonus| (bonus.applies)(biz))
        .fold(u32::from(BASE_SCORE), |acc, bonus| {
            acc + u32::from(bonus.points)
        });
    total.min(u32::from(MAX_SCORE)) as u8
}

pub fn is_high_fidelity(score: u8) -> bool {
    score > HIGH_FIDELITY_THRESHOLD
}

/// Mean score across a lead set; `0.0` when there are no leads.
pub fn mean_fidelity(leads: &[Business]) -> f64 {
    if leads.is_empty() {
        return 0.0;
    }
    let sum: u32 = leads.iter().map(|b| u32::from(fidelity_score(b))).sum();
    f64::from(sum) / leads.len() as f64
}

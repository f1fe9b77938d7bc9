#![deny(warnings)]

//! Monthly CPF arithmetic: interest, contributions and inter-account moves.
//!
//! This crate provides the pure rules applied by the runtime every month:
//! - Monthly interest with a bonus pool shared across OA, SA and MA
//! - Salary contributions capped by the salary ceiling
//! - Yearly inflation of statutory limits
//! - Routing of the OA contribution towards the FRS
//! - Medisave overflow into SA and OA
//!
//! Rates are annual percentages throughout; `12 * 100` turns them into
//! monthly fractions.

use serde::{Deserialize, Serialize};

/// One amount per sub-account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    pub oa: f64,
    pub sa: f64,
    pub ma: f64,
}

impl Balances {
    pub const ZERO: Balances = Balances {
        oa: 0.0,
        sa: 0.0,
        ma: 0.0,
    };

    pub fn new(oa: f64, sa: f64, ma: f64) -> Self {
        Self { oa, sa, ma }
    }

    pub fn total(&self) -> f64 {
        self.oa + self.sa + self.ma
    }
}

/// Convert an annual percentage into a monthly fraction.
///
/// Example:
/// assert_eq!(monthly_fraction(12.0), 0.01);
pub fn monthly_fraction(annual_pct: f64) -> f64 {
    annual_pct / (12.0 * 100.0)
}

/// Contribution for one account: the capped salary times `rate_pct` percent.
///
/// Example:
/// assert_eq!(contribution(5000.0, 6000.0, 20.0), 1000.0);
pub fn contribution(salary: f64, salary_limit: f64, rate_pct: f64) -> f64 {
    salary_limit.min(salary) * (rate_pct / 100.0)
}

/// Grow `value` by `pct` percent.
pub fn inflate(value: f64, pct: f64) -> f64 {
    value + value * (pct / 100.0)
}

/// Interest parameters shared by all three accounts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterestTerms {
    /// Base annual rate per account, in percent.
    pub rates: Balances,
    /// Extra annual rate in percent, paid on the eligible part of each balance.
    pub extra_rate: f64,
    /// Ceiling on the OA balance eligible for extra interest.
    pub oa_extra_cap: f64,
    /// Ceiling on the combined eligible balance.
    pub total_extra_cap: f64,
}

/// Split the extra-interest pool across accounts, consumed OA first, then SA, then MA.
///
/// `total_extra_cap` is expected to be at least `oa_extra_cap`.
pub fn extra_interest_eligibility(
    balances: &Balances,
    oa_extra_cap: f64,
    total_extra_cap: f64,
) -> Balances {
    let oa = balances.oa.min(oa_extra_cap);
    let sa = (total_extra_cap - oa).min(balances.sa);
    let ma = (total_extra_cap - oa - sa).min(balances.ma);
    Balances { oa, sa, ma }
}

/// One month of interest on `balance`, with `eligible` earning the extra rate on top.
pub fn monthly_interest(balance: f64, eligible: f64, rate_pct: f64, extra_rate_pct: f64) -> f64 {
    let extra = eligible * monthly_fraction(extra_rate_pct);
    let normal = balance * monthly_fraction(rate_pct);
    extra + normal
}

/// One month of interest for every account.
pub fn monthly_interest_all(balances: &Balances, terms: &InterestTerms) -> Balances {
    let eligible =
        extra_interest_eligibility(balances, terms.oa_extra_cap, terms.total_extra_cap);
    Balances {
        oa: monthly_interest(balances.oa, eligible.oa, terms.rates.oa, terms.extra_rate),
        sa: monthly_interest(balances.sa, eligible.sa, terms.rates.sa, terms.extra_rate),
        ma: monthly_interest(balances.ma, eligible.ma, terms.rates.ma, terms.extra_rate),
    }
}

/// Where the month's OA contribution ends up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpecialAllocation {
    /// Part of the OA contribution moved into SA.
    pub transfer: f64,
    /// Part of the OA contribution kept in OA.
    pub to_oa: f64,
    /// External cash injected into SA.
    pub top_up: f64,
}

impl SpecialAllocation {
    pub fn apply(&self, balances: &mut Balances) {
        balances.sa += self.transfer;
        balances.oa += self.to_oa;
        balances.sa += self.top_up;
    }
}

/// Route the OA contribution given the SA balance after its own contribution.
///
/// Once SA holds the FRS, OA keeps everything. Below the FRS, the shortfall
/// is filled from the OA contribution when `transfer_enabled`, then from up to
/// `top_up_allowance` of cash.
pub fn allocate_oa_contribution(
    sa_balance: f64,
    frs: f64,
    oa_contribution: f64,
    transfer_enabled: bool,
    top_up_allowance: f64,
) -> SpecialAllocation {
    if sa_balance >= frs {
        return SpecialAllocation {
            transfer: 0.0,
            to_oa: oa_contribution,
            top_up: 0.0,
        };
    }
    let transfer = if transfer_enabled {
        (frs - sa_balance).max(0.0).min(oa_contribution)
    } else {
        0.0
    };
    let sa_after = sa_balance + transfer;
    let top_up = if sa_after < frs {
        (frs - sa_after).max(0.0).min(top_up_allowance)
    } else {
        0.0
    };
    SpecialAllocation {
        transfer,
        to_oa: oa_contribution - transfer,
        top_up,
    }
}

/// Medisave balance above its cap and where it goes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Overflow {
    pub excess: f64,
    pub to_sa: f64,
    pub to_oa: f64,
}

impl Overflow {
    pub fn is_empty(&self) -> bool {
        self.excess == 0.0
    }

    pub fn apply(&self, balances: &mut Balances) {
        balances.oa += self.to_oa;
        balances.sa += self.to_sa;
        balances.ma -= self.excess;
    }
}

/// Excess of MA over `ma_limit`, routed to SA up to the FRS and the rest to OA.
pub fn medisave_overflow(balances: &Balances, ma_limit: f64, frs: f64) -> Overflow {
    let excess = (balances.ma - ma_limit).max(0.0);
    let to_sa = excess.min((frs - balances.sa).max(0.0));
    Overflow {
        excess,
        to_sa,
        to_oa: excess - to_sa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPS * a.abs().max(b.abs()).max(1.0)
    }

    fn terms() -> InterestTerms {
        InterestTerms {
            rates: Balances::new(2.5, 4.0, 4.0),
            extra_rate: 1.0,
            oa_extra_cap: 20_000.0,
            total_extra_cap: 60_000.0,
        }
    }

    #[test]
    fn contribution_caps_salary() {
        assert_eq!(contribution(5000.0, 6000.0, 20.0), 1000.0);
        assert_eq!(contribution(8000.0, 6000.0, 5.0), 300.0);
        assert_eq!(contribution(8000.0, 6000.0, 0.0), 0.0);
    }

    #[test]
    fn inflate_by_percent() {
        assert!(close(inflate(200_000.0, 3.0), 206_000.0));
        assert_eq!(inflate(60_000.0, 0.0), 60_000.0);
    }

    #[test]
    fn eligibility_consumes_pool_in_order() {
        let b = Balances::new(30_000.0, 25_000.0, 40_000.0);
        let e = extra_interest_eligibility(&b, 20_000.0, 60_000.0);
        assert_eq!(e, Balances::new(20_000.0, 25_000.0, 15_000.0));
    }

    #[test]
    fn eligibility_with_small_balances_takes_everything() {
        let b = Balances::new(1_000.0, 2_000.0, 3_000.0);
        let e = extra_interest_eligibility(&b, 20_000.0, 60_000.0);
        assert_eq!(e, b);
    }

    #[test]
    fn monthly_interest_splits_extra_and_normal() {
        // 20k eligible at 1% plus 30k at 2.5%, per month
        let i = monthly_interest(30_000.0, 20_000.0, 2.5, 1.0);
        assert!(close(i, 20_000.0 / 1200.0 + 30_000.0 * 2.5 / 1200.0));
    }

    #[test]
    fn monthly_interest_all_uses_shared_pool() {
        let b = Balances::new(30_000.0, 50_000.0, 10_000.0);
        let i = monthly_interest_all(&b, &terms());
        assert!(close(i.oa, 20_000.0 * (1.0 / 1200.0) + 30_000.0 * (2.5 / 1200.0)));
        assert!(close(i.sa, 40_000.0 * (1.0 / 1200.0) + 50_000.0 * (4.0 / 1200.0)));
        // pool exhausted by OA and SA
        assert!(close(i.ma, 10_000.0 * (4.0 / 1200.0)));
    }

    #[test]
    fn allocation_keeps_oa_when_target_met() {
        let a = allocate_oa_contribution(200_000.0, 200_000.0, 1000.0, true, 500.0);
        assert_eq!(
            a,
            SpecialAllocation {
                transfer: 0.0,
                to_oa: 1000.0,
                top_up: 0.0
            }
        );
    }

    #[test]
    fn allocation_transfers_up_to_shortfall() {
        let a = allocate_oa_contribution(199_600.0, 200_000.0, 1000.0, true, 500.0);
        assert!(close(a.transfer, 400.0));
        assert!(close(a.to_oa, 600.0));
        assert_eq!(a.top_up, 0.0);
    }

    #[test]
    fn allocation_without_transfer_tops_up_with_cash() {
        let a = allocate_oa_contribution(250.0, 200_000.0, 1000.0, false, 500.0);
        assert_eq!(a.transfer, 0.0);
        assert_eq!(a.to_oa, 1000.0);
        assert_eq!(a.top_up, 500.0);
    }

    #[test]
    fn top_up_limited_by_remaining_shortfall() {
        let a = allocate_oa_contribution(199_000.0, 200_000.0, 800.0, true, 500.0);
        assert!(close(a.transfer, 800.0));
        assert!(close(a.top_up, 200.0));
        let mut b = Balances::new(0.0, 199_000.0, 0.0);
        a.apply(&mut b);
        assert!(close(b.sa, 200_000.0));
        assert!(close(b.oa, 0.0));
    }

    #[test]
    fn overflow_fills_sa_then_oa() {
        let b = Balances::new(0.0, 199_000.0, 62_000.0);
        let o = medisave_overflow(&b, 60_000.0, 200_000.0);
        assert_eq!(
            o,
            Overflow {
                excess: 2000.0,
                to_sa: 1000.0,
                to_oa: 1000.0
            }
        );
        let mut after = b;
        o.apply(&mut after);
        assert_eq!(after, Balances::new(1000.0, 200_000.0, 60_000.0));
    }

    #[test]
    fn no_overflow_below_cap() {
        let b = Balances::new(0.0, 0.0, 59_999.0);
        assert!(medisave_overflow(&b, 60_000.0, 200_000.0).is_empty());
    }

    proptest! {
        #[test]
        fn overflow_conserves_total_and_caps_ma(oa in 0.0f64..1e6, sa in 0.0f64..1e6,
                                               ma in 0.0f64..1e6, limit in 0.0f64..1e6,
                                               frs in 0.0f64..1e6) {
            let mut b = Balances::new(oa, sa, ma);
            let before = b.total();
            let o = medisave_overflow(&b, limit, frs);
            o.apply(&mut b);
            prop_assert!(close(b.total(), before));
            prop_assert!(b.ma <= limit + EPS * limit.max(1.0) || o.is_empty());
            prop_assert!(o.to_sa >= 0.0 && o.to_oa >= 0.0);
        }

        #[test]
        fn eligibility_never_exceeds_pool(oa in 0.0f64..1e6, sa in 0.0f64..1e6,
                                          ma in 0.0f64..1e6, oa_cap in 0.0f64..1e5,
                                          extra in 0.0f64..1e5) {
            let total_cap = oa_cap + extra;
            let e = extra_interest_eligibility(&Balances::new(oa, sa, ma), oa_cap, total_cap);
            prop_assert!(e.oa <= oa && e.sa <= sa && e.ma <= ma);
            prop_assert!(e.oa >= 0.0 && e.sa >= 0.0 && e.ma >= 0.0);
            prop_assert!(e.total() <= total_cap * (1.0 + EPS) + EPS);
        }

        #[test]
        fn allocation_never_overshoots_frs(sa in 0.0f64..3e5, frs in 0.0f64..3e5,
                                           oa_c in 0.0f64..5e3, top_up in 0.0f64..5e3,
                                           enabled in any::<bool>()) {
            let a = allocate_oa_contribution(sa, frs, oa_c, enabled, top_up);
            prop_assert!(close(a.transfer + a.to_oa, oa_c));
            if sa < frs {
                prop_assert!(sa + a.transfer + a.top_up <= frs + EPS * frs.max(1.0));
            } else {
                prop_assert_eq!(a.transfer, 0.0);
                prop_assert_eq!(a.top_up, 0.0);
            }
        }
    }
}

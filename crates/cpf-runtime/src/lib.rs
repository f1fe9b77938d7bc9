#![deny(warnings)]

//! Month-by-month CPF account simulation.
//!
//! [`AccountState`] owns every mutable quantity of a run and advances it by
//! one calendar month per [`AccountState::advance`] call. The start date is
//! always supplied by the caller; nothing here reads the clock.

use chrono::{Datelike, NaiveDate};
use cpf_core::{
    find_band, validate_birth_month, BandSection, Config, ConfigError, ContributionBand,
    SalaryBand,
};
use cpf_rules::{
    allocate_oa_contribution, contribution, inflate, medisave_overflow, monthly_interest_all,
    Balances, InterestTerms, Overflow,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Contribution percentages in force for the current age.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ContributionRates {
    pub oa: f64,
    pub sa: f64,
    pub ma: f64,
}

/// What happened during one [`AccountState::advance`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MonthReport {
    /// SA held at least the FRS at the end of the month.
    pub sa_reached_frs: bool,
    /// FRS and MA limit were inflated (January).
    pub inflation_applied: bool,
    /// Interest credited to the balances (December).
    pub interest_credited: Option<Balances>,
    /// Overflow performed right after the December credit.
    pub year_end_overflow: Option<Overflow>,
    /// Overflow performed at the end of the month.
    pub overflow: Overflow,
}

/// Observable state after a month, for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub year: i32,
    pub month: u32,
    pub age: u32,
    pub oa_balance: f64,
    pub sa_balance: f64,
    pub ma_balance: f64,
    pub frs: f64,
    pub ma_limit: f64,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "year: {} | month: {:>2} | age: {} | oa: {:.2} | sa: {:.2} | ma: {:.2} | frs: {:.2}",
            self.year,
            self.month,
            self.age,
            self.oa_balance,
            self.sa_balance,
            self.ma_balance,
            self.frs
        )
    }
}

/// Scalar parameters copied out of the configuration at construction.
#[derive(Clone, Debug)]
struct Parameters {
    retirement_age: u32,
    birth_month: u32,
    salary_limit: f64,
    monthly_cash_top_up_to_sa: f64,
    transfer_from_oa_to_sa_monthly: bool,
    frs_inflation_rate: f64,
    ma_limit_inflation_rate: f64,
    interest: InterestTerms,
}

impl Parameters {
    fn from_config(config: &Config) -> Self {
        let cpf = &config.cpf;
        Self {
            retirement_age: config.retirement_age,
            birth_month: config.birth_month,
            salary_limit: cpf.salary_limit,
            monthly_cash_top_up_to_sa: cpf.monthly_cash_top_up_to_sa,
            transfer_from_oa_to_sa_monthly: cpf.transfer_from_oa_to_sa_monthly,
            frs_inflation_rate: cpf.frs_inflation_rate,
            ma_limit_inflation_rate: cpf.ma.max_allowable_balance_inflation_rate,
            interest: InterestTerms {
                rates: Balances::new(
                    cpf.oa.interest_rate,
                    cpf.sa.interest_rate,
                    cpf.ma.interest_rate,
                ),
                extra_rate: cpf.extra_interest_rate,
                oa_extra_cap: cpf.oa.extra_interest_cap,
                total_extra_cap: cpf.total_extra_interest_cap,
            },
        }
    }
}

/// Age bands consulted every month.
#[derive(Clone, Debug)]
struct Schedule {
    contribution: Vec<ContributionBand>,
    salary: Vec<SalaryBand>,
}

impl Schedule {
    fn lookup(&self, age: u32) -> Result<(ContributionRates, f64), ConfigError> {
        let band = find_band(&self.contribution, age).ok_or(ConfigError::MissingBand {
            section: BandSection::ContributionRate,
            age,
        })?;
        let salary = find_band(&self.salary, age).ok_or(ConfigError::MissingBand {
            section: BandSection::Salary,
            age,
        })?;
        Ok((
            ContributionRates {
                oa: band.oa,
                sa: band.sa,
                ma: band.ma,
            },
            salary.salary,
        ))
    }
}

/// Mutable state of one simulation run.
#[derive(Clone, Debug)]
pub struct AccountState {
    params: Parameters,
    schedule: Schedule,
    initial_year: i32,
    year: i32,
    month: u32,
    age: u32,
    balances: Balances,
    last_year_interest: Balances,
    frs: f64,
    ma_limit: f64,
    rates: ContributionRates,
    salary: f64,
}

impl AccountState {
    /// Build the state for a validated configuration, starting in the month of `start`.
    ///
    /// Fails if no band covers the current age, or if the birth month could
    /// never be reached.
    pub fn new(config: &Config, start: NaiveDate) -> Result<Self, ConfigError> {
        validate_birth_month(config)?;
        let cpf = &config.cpf;
        let schedule = Schedule {
            contribution: cpf.contribution_rate.clone(),
            salary: config.salary.clone(),
        };
        let (rates, salary) = schedule.lookup(config.current_age)?;
        Ok(Self {
            params: Parameters::from_config(config),
            schedule,
            initial_year: start.year(),
            year: start.year(),
            month: start.month(),
            age: config.current_age,
            balances: Balances::new(cpf.oa.balance, cpf.sa.balance, cpf.ma.balance),
            last_year_interest: Balances::ZERO,
            frs: cpf.frs,
            ma_limit: cpf.ma.max_allowable_balance,
            rates,
            salary,
        })
    }

    /// Advance the simulation by one month.
    pub fn advance(&mut self) -> Result<MonthReport, ConfigError> {
        self.update_age();
        let mut report = self.update_balances()?;
        report.sa_reached_frs = self.balances.sa >= self.frs;
        if report.sa_reached_frs {
            info!(
                year = self.year,
                month = self.month,
                sa = self.balances.sa,
                frs = self.frs,
                "SA balance has reached the full retirement sum"
            );
        }
        debug!(
            year = self.year,
            month = self.month,
            age = self.age,
            oa = self.balances.oa,
            sa = self.balances.sa,
            ma = self.balances.ma,
            "month advanced"
        );
        Ok(report)
    }

    fn update_age(&mut self) {
        if self.month == 12 {
            self.year += 1;
        }
        self.month = self.month % 12 + 1;
        if self.month == self.params.birth_month {
            self.age += 1;
        }
    }

    fn update_balances(&mut self) -> Result<MonthReport, ConfigError> {
        let (rates, salary) = self.schedule.lookup(self.age)?;
        self.rates = rates;
        self.salary = salary;

        let accrued = self.last_year_interest;
        let mut report = MonthReport::default();

        match self.month {
            1 if self.year != self.initial_year => {
                self.frs = inflate(self.frs, self.params.frs_inflation_rate);
                self.ma_limit = inflate(self.ma_limit, self.params.ma_limit_inflation_rate);
                report.inflation_applied = true;
                info!(
                    year = self.year,
                    frs = self.frs,
                    ma_limit = self.ma_limit,
                    "limits inflated"
                );
            }
            12 => {
                self.balances.oa += accrued.oa;
                self.balances.sa += accrued.sa;
                self.balances.ma += accrued.ma;
                report.year_end_overflow = Some(self.overflow_ma());
                self.last_year_interest = Balances::ZERO;
                report.interest_credited = Some(accrued);
                info!(
                    year = self.year,
                    oa = accrued.oa,
                    sa = accrued.sa,
                    ma = accrued.ma,
                    "interest credited"
                );
            }
            _ => {}
        }

        let interest = monthly_interest_all(&self.balances, &self.params.interest);
        self.last_year_interest.oa += interest.oa;
        self.last_year_interest.sa += interest.sa;
        self.last_year_interest.ma += interest.ma;

        let limit = self.params.salary_limit;
        self.balances.sa += contribution(self.salary, limit, self.rates.sa);
        allocate_oa_contribution(
            self.balances.sa,
            self.frs,
            contribution(self.salary, limit, self.rates.oa),
            self.params.transfer_from_oa_to_sa_monthly,
            self.params.monthly_cash_top_up_to_sa,
        )
        .apply(&mut self.balances);

        self.balances.ma += contribution(self.salary, limit, self.rates.ma);
        report.overflow = self.overflow_ma();
        Ok(report)
    }

    fn overflow_ma(&mut self) -> Overflow {
        let overflow = medisave_overflow(&self.balances, self.ma_limit, self.frs);
        overflow.apply(&mut self.balances);
        overflow
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    /// Year of the start date.
    pub fn initial_year(&self) -> i32 {
        self.initial_year
    }

    pub fn retirement_age(&self) -> u32 {
        self.params.retirement_age
    }

    pub fn is_retired(&self) -> bool {
        self.age >= self.params.retirement_age
    }

    pub fn balances(&self) -> Balances {
        self.balances
    }

    pub fn oa_balance(&self) -> f64 {
        self.balances.oa
    }

    pub fn sa_balance(&self) -> f64 {
        self.balances.sa
    }

    pub fn ma_balance(&self) -> f64 {
        self.balances.ma
    }

    /// Interest accrued since the last December credit.
    pub fn last_year_interest(&self) -> Balances {
        self.last_year_interest
    }

    pub fn frs(&self) -> f64 {
        self.frs
    }

    pub fn ma_limit(&self) -> f64 {
        self.ma_limit
    }

    pub fn rates(&self) -> ContributionRates {
        self.rates
    }

    pub fn salary(&self) -> f64 {
        self.salary
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            year: self.year,
            month: self.month,
            age: self.age,
            oa_balance: self.balances.oa,
            sa_balance: self.balances.sa,
            ma_balance: self.balances.ma,
            frs: self.frs,
            ma_limit: self.ma_limit,
        }
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.snapshot().fmt(f)
    }
}

/// Months between the current and the retirement age, counted in whole years.
pub fn months_until_retirement(config: &Config) -> u32 {
    12 * config.retirement_age.saturating_sub(config.current_age)
}

/// Advance `months` times, collecting a snapshot after each month.
pub fn run_months(state: &mut AccountState, months: u32) -> Result<Vec<Snapshot>, ConfigError> {
    let mut out = Vec::with_capacity(months as usize);
    for _ in 0..months {
        state.advance()?;
        out.push(state.snapshot());
    }
    Ok(out)
}

/// Advance until the age reaches the retirement age.
pub fn run_until_retirement(state: &mut AccountState) -> Result<Vec<Snapshot>, ConfigError> {
    let remaining = state.retirement_age().saturating_sub(state.age());
    let mut out = Vec::with_capacity(12 * remaining as usize);
    while !state.is_retired() {
        state.advance()?;
        out.push(state.snapshot());
    }
    info!(
        months = out.len(),
        age = state.age(),
        sa = state.sa_balance(),
        frs = state.frs(),
        "reached retirement age"
    );
    Ok(out)
}

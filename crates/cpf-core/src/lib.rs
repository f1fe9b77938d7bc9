#![deny(warnings)]

//! Configuration model and invariants for the CPF planner.
//!
//! This crate defines the serializable configuration consumed by the
//! simulation, the age-band lookup shared by every consumer, and the
//! validation that rejects a configuration before any state is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Ordinary Account parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrdinaryAccount {
    /// Starting balance.
    pub balance: f64,
    /// Annual interest rate in percent.
    pub interest_rate: f64,
    /// Portion of the OA balance eligible for extra interest.
    pub extra_interest_cap: f64,
}

/// Special Account parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpecialAccount {
    /// Starting balance.
    pub balance: f64,
    /// Annual interest rate in percent.
    pub interest_rate: f64,
}

/// Medisave Account parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MedisaveAccount {
    /// Starting balance.
    pub balance: f64,
    /// Annual interest rate in percent.
    pub interest_rate: f64,
    /// Cap above which MA overflows into SA/OA.
    pub max_allowable_balance: f64,
    /// Yearly inflation of the cap in percent.
    pub max_allowable_balance_inflation_rate: f64,
}

/// Contribution percentages for an inclusive age range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContributionBand {
    pub lower_limit: u32,
    pub upper_limit: u32,
    /// Percent of eligible salary credited to OA.
    pub oa: f64,
    /// Percent of eligible salary credited to SA.
    pub sa: f64,
    /// Percent of eligible salary credited to MA.
    pub ma: f64,
}

/// Monthly salary for an inclusive age range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SalaryBand {
    pub lower_limit: u32,
    pub upper_limit: u32,
    pub salary: f64,
}

/// Statutory parameters and account balances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CpfConfig {
    /// Monthly salary ceiling for contributions.
    pub salary_limit: f64,
    /// Cash injected into SA each month while it is below the FRS.
    pub monthly_cash_top_up_to_sa: f64,
    /// Whether the OA contribution is redirected to SA until the FRS is met.
    pub transfer_from_oa_to_sa_monthly: bool,
    /// Full Retirement Sum, the SA target.
    pub frs: f64,
    /// Yearly FRS inflation in percent.
    pub frs_inflation_rate: f64,
    /// Extra interest rate in percent, shared by all accounts.
    pub extra_interest_rate: f64,
    /// Combined balance eligible for extra interest across OA, SA and MA.
    pub total_extra_interest_cap: f64,
    pub oa: OrdinaryAccount,
    pub sa: SpecialAccount,
    pub ma: MedisaveAccount,
    pub contribution_rate: Vec<ContributionBand>,
}

/// Top-level simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub current_age: u32,
    pub retirement_age: u32,
    /// Month (1-12) in which the age increments.
    pub birth_month: u32,
    pub cpf: CpfConfig,
    pub salary: Vec<SalaryBand>,
}

impl Config {
    /// Contribution band covering `age`, if any.
    pub fn contribution_band(&self, age: u32) -> Option<&ContributionBand> {
        find_band(&self.cpf.contribution_rate, age)
    }

    /// Salary band covering `age`, if any.
    pub fn salary_band(&self, age: u32) -> Option<&SalaryBand> {
        find_band(&self.salary, age)
    }
}

/// An inclusive age interval carrying per-age data.
pub trait AgeBand {
    fn lower_limit(&self) -> u32;
    fn upper_limit(&self) -> u32;

    fn covers(&self, age: u32) -> bool {
        (self.lower_limit()..=self.upper_limit()).contains(&age)
    }
}

impl AgeBand for ContributionBand {
    fn lower_limit(&self) -> u32 {
        self.lower_limit
    }
    fn upper_limit(&self) -> u32 {
        self.upper_limit
    }
}

impl AgeBand for SalaryBand {
    fn lower_limit(&self) -> u32 {
        self.lower_limit
    }
    fn upper_limit(&self) -> u32 {
        self.upper_limit
    }
}

/// First band containing `age`, in configuration order.
pub fn find_band<B: AgeBand>(bands: &[B], age: u32) -> Option<&B> {
    bands.iter().find(|b| b.covers(age))
}

/// Which banded list of the configuration an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandSection {
    ContributionRate,
    Salary,
}

impl fmt::Display for BandSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandSection::ContributionRate => f.write_str("contribution-rate"),
            BandSection::Salary => f.write_str("salary"),
        }
    }
}

/// Ways a banded list can fail to tile the simulated age range.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CoverageIssue {
    /// No band contributes any age.
    #[error("no ages covered")]
    Empty,
    /// The youngest covered age is above the current age.
    #[error("coverage starts at {min}")]
    StartsAfterCurrentAge { min: u32 },
    /// The oldest covered age is below the retirement age.
    #[error("coverage ends at {max}")]
    EndsBeforeRetirementAge { max: u32 },
    /// An age between the youngest and oldest is not covered.
    #[error("age {age} is not covered")]
    Gap { age: u32 },
    /// An age is covered by more than one band.
    #[error("age {age} is covered more than once")]
    Overlap { age: u32 },
}

/// Configuration errors. All of them are fatal to a simulation run.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error(
        "configuration error in current-age/retirement-age: \
         current age {current_age} > retirement age {retirement_age}"
    )]
    RetirementBeforeCurrentAge { current_age: u32, retirement_age: u32 },
    #[error(
        "configuration error in {section} {bands:?}: age ranges are invalid/insufficient \
         ({issue}), current age: {current_age}, retirement age: {retirement_age}"
    )]
    InvalidAgeBands {
        section: BandSection,
        /// The offending `(lower-limit, upper-limit)` pairs as configured.
        bands: Vec<(u32, u32)>,
        current_age: u32,
        retirement_age: u32,
        issue: CoverageIssue,
    },
    #[error(
        "configuration error in oa extra interest cap/combined extra interest cap: \
         oa extra interest cap {oa_cap} > combined extra interest cap {total_cap}"
    )]
    ExtraInterestCapExceeded { oa_cap: f64, total_cap: f64 },
    #[error("configuration error in birth-month: {0} is not in 1..=12")]
    InvalidBirthMonth(u32),
    /// Raised during simulation when no band covers the current age.
    #[error("could not find {section} for age {age}")]
    MissingBand { section: BandSection, age: u32 },
}

/// Check that `bands` tile a contiguous age range spanning at least
/// `[current_age, retirement_age]` without covering any age twice.
pub fn check_band_coverage<B: AgeBand>(
    bands: &[B],
    current_age: u32,
    retirement_age: u32,
) -> Result<(), CoverageIssue> {
    // Inverted bands cover no ages.
    let mut spans: Vec<(u32, u32)> = bands
        .iter()
        .filter(|b| b.lower_limit() <= b.upper_limit())
        .map(|b| (b.lower_limit(), b.upper_limit()))
        .collect();
    spans.sort_unstable();

    let Some(&(min, _)) = spans.first() else {
        return Err(CoverageIssue::Empty);
    };
    let max = spans.iter().map(|&(_, upper)| upper).max().unwrap_or(min);
    if min > current_age {
        return Err(CoverageIssue::StartsAfterCurrentAge { min });
    }
    if max < retirement_age {
        return Err(CoverageIssue::EndsBeforeRetirementAge { max });
    }

    let mut covered_to = spans[0].1;
    for &(lower, upper) in &spans[1..] {
        if lower <= covered_to {
            return Err(CoverageIssue::Overlap { age: lower });
        }
        // lower > covered_to here, so covered_to + 1 cannot overflow
        if lower > covered_to + 1 {
            return Err(CoverageIssue::Gap { age: covered_to + 1 });
        }
        covered_to = upper;
    }
    Ok(())
}

fn validate_bands<B: AgeBand>(
    section: BandSection,
    bands: &[B],
    current_age: u32,
    retirement_age: u32,
) -> Result<(), ConfigError> {
    check_band_coverage(bands, current_age, retirement_age).map_err(|issue| {
        ConfigError::InvalidAgeBands {
            section,
            bands: bands
                .iter()
                .map(|b| (b.lower_limit(), b.upper_limit()))
                .collect(),
            current_age,
            retirement_age,
            issue,
        }
    })
}

/// Validate the ordering of current and retirement age.
pub fn validate_retirement_age(config: &Config) -> Result<(), ConfigError> {
    if config.retirement_age < config.current_age {
        return Err(ConfigError::RetirementBeforeCurrentAge {
            current_age: config.current_age,
            retirement_age: config.retirement_age,
        });
    }
    Ok(())
}

/// Validate the contribution-rate bands.
pub fn validate_contribution_bands(config: &Config) -> Result<(), ConfigError> {
    validate_bands(
        BandSection::ContributionRate,
        &config.cpf.contribution_rate,
        config.current_age,
        config.retirement_age,
    )
}

/// Validate the salary bands.
pub fn validate_salary_bands(config: &Config) -> Result<(), ConfigError> {
    validate_bands(
        BandSection::Salary,
        &config.salary,
        config.current_age,
        config.retirement_age,
    )
}

/// Validate that the OA share of the extra interest cap fits the combined cap.
pub fn validate_extra_interest(config: &Config) -> Result<(), ConfigError> {
    let cpf = &config.cpf;
    if cpf.total_extra_interest_cap < cpf.oa.extra_interest_cap {
        return Err(ConfigError::ExtraInterestCapExceeded {
            oa_cap: cpf.oa.extra_interest_cap,
            total_cap: cpf.total_extra_interest_cap,
        });
    }
    Ok(())
}

/// Validate the birth month.
pub fn validate_birth_month(config: &Config) -> Result<(), ConfigError> {
    if !(1..=12).contains(&config.birth_month) {
        return Err(ConfigError::InvalidBirthMonth(config.birth_month));
    }
    Ok(())
}

/// Validate the whole configuration, stopping at the first failing check.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_retirement_age(config)?;
    validate_contribution_bands(config)?;
    validate_salary_bands(config)?;
    validate_extra_interest(config)?;
    validate_birth_month(config)?;
    debug!(
        current_age = config.current_age,
        retirement_age = config.retirement_age,
        "configuration validated"
    );
    Ok(())
}

/// Validate and hand the configuration back unchanged.
pub fn validate(config: Config) -> Result<Config, ConfigError> {
    validate_config(&config)?;
    Ok(config)
}

use serde::{Deserialize, Serialize};

/// Order in which candidate actions are evaluated. The first candidate with
/// the minimal distance wins under either order.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Order in which the actions appear in the night's input mapping.
    #[default]
    Insertion,
    /// Ascending action name.
    Lexicographic,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Round cap used when running to completion.
    pub max_rounds: usize,
    /// Target composite sleep index (CSI).
    pub target_primary: f64,
    /// Target stability index (CStab).
    pub target_stability: f64,
    /// Candidate evaluation order for the nightly decision.
    pub tie_break: TieBreak,
    /// Plan all subjects of a round on the rayon pool before committing.
    pub parallel_planning: bool,
    /// Store round metrics every `sample_every` rounds. The final round is
    /// always sampled.
    pub sample_every: usize,
    /// Store a per-subject frame alongside each sampled round.
    pub collect_subject_frames: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_rounds: crate::constants::DEFAULT_MAX_ROUNDS,
            target_primary: crate::constants::TARGET_PRIMARY,
            target_stability: crate::constants::TARGET_STABILITY,
            tie_break: TieBreak::Insertion,
            parallel_planning: false,
            sample_every: 1,
            collect_subject_frames: false,
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidTargetPrimary => "target_primary must be finite";
    InvalidTargetStability => "target_stability must be finite";
    InvalidSampleEvery => "sample_every must be greater than 0";
    TooManyRounds { max: usize, actual: usize } => "max_rounds ({}) exceeds supported maximum ({})", actual, max;
}

impl std::error::Error for SimConfigError {}

impl SimConfig {
    pub const MAX_ROUNDS: usize = crate::constants::MAX_ROUNDS;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_target()?;
        self.validate_schedule()?;
        Ok(())
    }

    fn validate_target(&self) -> Result<(), SimConfigError> {
        if !self.target_primary.is_finite() {
            return Err(SimConfigError::InvalidTargetPrimary);
        }
        if !self.target_stability.is_finite() {
            return Err(SimConfigError::InvalidTargetStability);
        }
        Ok(())
    }

    fn validate_schedule(&self) -> Result<(), SimConfigError> {
        if self.sample_every == 0 {
            return Err(SimConfigError::InvalidSampleEvery);
        }
        if self.max_rounds > Self::MAX_ROUNDS {
            return Err(SimConfigError::TooManyRounds {
                max: Self::MAX_ROUNDS,
                actual: self.max_rounds,
            });
        }
        Ok(())
    }

    /// Target point as `(primary, stability)`.
    pub fn target(&self) -> (f64, f64) {
        (self.target_primary, self.target_stability)
    }
}

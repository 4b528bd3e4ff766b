use std::path::PathBuf;

use crate::energy::EnergyMode;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyArg {
    /// Single snapped midpoint (~500mWh)
    Mid,
    /// Literal low–high bounds (0.13–1.2Wh)
    Range,
}

impl From<EnergyArg> for EnergyMode {
    fn from(arg: EnergyArg) -> Self {
        match arg {
            EnergyArg::Mid => EnergyMode::Mid,
            EnergyArg::Range => EnergyMode::Range,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportArg {
    /// Today only
    Today,
    /// Last 7 days ending today
    Week,
    /// Last 30 days ending today
    Month,
}

impl ReportArg {
    pub fn days(self) -> u32 {
        match self {
            ReportArg::Today => 1,
            ReportArg::Week => 7,
            ReportArg::Month => 30,
        }
    }
}

#[derive(clap::Parser, Debug)]
#[command(name = "energy-statusline", version)]
pub struct Args {
    /// Directory holding the daily state, history and caches. Defaults to ~/.claude
    #[arg(long, env = "ENERGY_STATUSLINE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Energy display: mid|range
    #[arg(long, value_enum, env = "ENERGY_STATUSLINE_ENERGY", default_value_t = EnergyArg::Mid)]
    pub energy: EnergyArg,

    /// Skip the OAuth quota lookup entirely
    #[arg(long, env = "ENERGY_STATUSLINE_NO_QUOTA")]
    pub no_quota: bool,

    /// Print a usage summary instead of reading a snapshot: today|week|month
    #[arg(long, value_enum)]
    pub report: Option<ReportArg>,

    /// Colorize percentages (honors NO_COLOR; needs the `colors` feature)
    #[arg(long, env = "ENERGY_STATUSLINE_COLOR")]
    pub color: bool,

    /// Debug logging to stderr
    #[arg(long, env = "ENERGY_STATUSLINE_DEBUG")]
    pub debug: bool,

    /// Append every raw snapshot to statusline_debug.jsonl
    #[arg(long, env = "ENERGY_DEBUG")]
    pub debug_capture: bool,
}

impl Args {
    pub fn parse() -> Self {
        <Args as clap::Parser>::parse()
    }

    pub fn energy_mode(&self) -> EnergyMode {
        self.energy.into()
    }

    pub fn use_color(&self) -> bool {
        #[cfg(feature = "colors")]
        {
            self.color && std::env::var_os("NO_COLOR").is_none()
        }
        #[cfg(not(feature = "colors"))]
        {
            let _ = self.color;
            false
        }
    }
}

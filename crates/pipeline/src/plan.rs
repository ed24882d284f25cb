//! Pairing and rename planning.
//!
//! Walks the scanned assets in discovery order, groups each HDR PNG with the
//! EXR that follows it into one shot, numbers the shots, and computes a unique
//! destination name for every asset. Nothing on disk is touched here.

use crate::classify::{DynamicRange, SourceFormat};
use crate::scan::SourceAsset;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use truehdr_config::{Settings, ZeroFillMode, MAX_ZERO_FILL_DIGITS};

/// Characters that cannot appear in a file name on common filesystems.
pub const ILLEGAL_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Minimum digit width of the `_DuplicateNN` counter.
pub const MIN_DUPLICATE_WIDTH: usize = 2;

/// Errors that make a rename plan impossible.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The prefix cannot be used in a file name.
    #[error("Invalid prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    /// A fixed zero-fill width is too narrow for the last shot number.
    #[error("Counter overflow: shot number {last_ordinal} needs {needed} digits but zero-fill is fixed at {width}")]
    CounterOverflow {
        width: usize,
        last_ordinal: u32,
        needed: usize,
    },

    /// A fixed zero-fill width outside 1..=9.
    #[error("Invalid zero-fill width {digits}: must be between 1 and {max}", max = MAX_ZERO_FILL_DIGITS)]
    InvalidZeroFill { digits: usize },

    /// Numbering from `start` runs past the largest representable shot number.
    #[error("Counter overflow: {shots} shots starting at {start} exceed the largest shot number")]
    OrdinalOverflow { start: u32, shots: usize },
}

/// Zero-fill policy for the shot counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroFill {
    /// No padding.
    Off,
    /// Minimum width that fits the last shot number.
    Auto,
    /// Fixed width; too many shots is an error.
    Fixed(usize),
}

/// How destination basenames are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    /// When false, every shot keeps the stem of its first file.
    pub rename_enabled: bool,
    pub prefix: String,
    /// When false, names carry only the prefix and range suffix.
    pub counter_enabled: bool,
    pub start: u32,
    pub zero_fill: ZeroFill,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl NamingPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        let zero_fill = if !settings.zero_fill_enabled {
            ZeroFill::Off
        } else {
            match settings.zero_fill_mode {
                ZeroFillMode::Auto => ZeroFill::Auto,
                ZeroFillMode::Manual => ZeroFill::Fixed(settings.zero_fill_digits as usize),
            }
        };
        Self {
            rename_enabled: settings.rename_enabled,
            prefix: settings.prefix.clone(),
            counter_enabled: settings.counter_enabled,
            start: settings.start_counter,
            zero_fill,
        }
    }
}

/// Suffix tags appended after the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixTag {
    Hdr,
    /// Collision counter and the width it is rendered at.
    Duplicate { number: u32, width: usize },
}

impl std::fmt::Display for SuffixTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuffixTag::Hdr => write!(f, "_HDR"),
            SuffixTag::Duplicate { number, width } => {
                write!(f, "_Duplicate{:0width$}", number, width = *width)
            }
        }
    }
}

/// A set of assets that represent the same photograph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShotGroup {
    pub ordinal: u32,
    pub range: DynamicRange,
    /// Discovery indexes of the member assets.
    pub members: Vec<usize>,
    /// An EXR that found no HDR PNG to pair with.
    pub unpaired_exr: bool,
}

/// One planned rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlanEntry {
    pub source: SourceAsset,
    /// Index into [`RenamePlan::groups`].
    pub group: usize,
    pub ordinal: u32,
    pub basename: String,
    pub extension: &'static str,
    pub tags: Vec<SuffixTag>,
}

impl RenamePlanEntry {
    /// `basename.extension`
    pub fn destination_name(&self) -> String {
        format!("{}.{}", self.basename, self.extension)
    }
}

/// Non-fatal findings while planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// An EXR without an HDR PNG partner; it forms its own shot.
    UnpairedExr { file: String },
    /// A computed basename was already taken and got a duplicate suffix.
    DuplicateName { basename: String, assigned: String },
}

impl std::fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanWarning::UnpairedExr { file } => {
                write!(f, "Unpaired EXR {} has no HDR PNG partner; keeping it as its own shot", file)
            }
            PlanWarning::DuplicateName { basename, assigned } => {
                write!(f, "Name {} already used; assigned {}", basename, assigned)
            }
        }
    }
}

/// The complete rename plan for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    /// One entry per asset, in discovery order.
    pub entries: Vec<RenamePlanEntry>,
    pub groups: Vec<ShotGroup>,
    /// Digits used for the shot counter (0 = unpadded).
    pub counter_width: usize,
    pub warnings: Vec<PlanWarning>,
}

impl RenamePlan {
    pub fn shot_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Checks that a prefix can be embedded in a file name.
pub fn validate_prefix(prefix: &str, counter_enabled: bool) -> Result<(), PlanError> {
    let invalid = |reason: String| PlanError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason,
    };

    if let Some(c) = prefix.chars().find(|c| ILLEGAL_NAME_CHARS.contains(c)) {
        return Err(invalid(format!("contains illegal character {:?}", c)));
    }
    if prefix.chars().any(char::is_control) {
        return Err(invalid("contains a control character".to_string()));
    }
    if !counter_enabled && prefix.trim().is_empty() {
        return Err(invalid("must not be blank when the counter is disabled".to_string()));
    }
    Ok(())
}

/// Number of decimal digits in `n`.
pub fn digit_count(n: u32) -> usize {
    n.to_string().len()
}

/// Resolves the counter width for the last shot number.
pub fn counter_width(zero_fill: ZeroFill, last_ordinal: u32) -> Result<usize, PlanError> {
    let needed = digit_count(last_ordinal);
    match zero_fill {
        ZeroFill::Off => Ok(0),
        ZeroFill::Auto => Ok(needed),
        ZeroFill::Fixed(width) if width == 0 || width > MAX_ZERO_FILL_DIGITS as usize => {
            Err(PlanError::InvalidZeroFill { digits: width })
        }
        ZeroFill::Fixed(width) if width < needed => Err(PlanError::CounterOverflow {
            width,
            last_ordinal,
            needed,
        }),
        ZeroFill::Fixed(width) => Ok(width),
    }
}

/// Groups assets into shots.
///
/// An HDR PNG opens a shot and waits for one EXR. An EXR joins the most recent
/// HDR PNG that is still waiting; a later HDR PNG takes over the waiting slot.
/// An EXR with nobody waiting becomes its own shot and is reported.
/// SDR PNGs are always shots of their own.
///
/// Fails when a shot number would pass `u32::MAX`.
pub fn group_assets(
    assets: &[SourceAsset],
    start: u32,
) -> Result<(Vec<ShotGroup>, Vec<PlanWarning>), PlanError> {
    let mut groups: Vec<ShotGroup> = Vec::new();
    let mut warnings = Vec::new();
    let mut waiting_hdr: Option<usize> = None;

    let open_group = |groups: &mut Vec<ShotGroup>,
                      range: DynamicRange,
                      member: usize,
                      unpaired_exr: bool|
     -> Result<usize, PlanError> {
        let ordinal = u32::try_from(groups.len())
            .ok()
            .and_then(|offset| start.checked_add(offset))
            .ok_or(PlanError::OrdinalOverflow {
                start,
                shots: groups.len() + 1,
            })?;
        groups.push(ShotGroup {
            ordinal,
            range,
            members: vec![member],
            unpaired_exr,
        });
        Ok(groups.len() - 1)
    };

    for asset in assets {
        match (asset.format, asset.range) {
            (SourceFormat::Png, DynamicRange::Hdr) => {
                let g = open_group(&mut groups, DynamicRange::Hdr, asset.index, false)?;
                waiting_hdr = Some(g);
            }
            (SourceFormat::Png, DynamicRange::Sdr) => {
                open_group(&mut groups, DynamicRange::Sdr, asset.index, false)?;
            }
            (SourceFormat::Exr, _) => match waiting_hdr.take() {
                Some(g) => groups[g].members.push(asset.index),
                None => {
                    open_group(&mut groups, DynamicRange::Hdr, asset.index, true)?;
                    warnings.push(PlanWarning::UnpairedExr {
                        file: asset.file_name(),
                    });
                }
            },
        }
    }

    Ok((groups, warnings))
}

/// Allocates unique basenames, appending `_DuplicateNN` on collision.
///
/// Names are compared case-insensitively so the plan is safe on
/// case-insensitive filesystems.
#[derive(Debug, Default)]
struct NameAllocator {
    taken: HashSet<String>,
    next_duplicate: HashMap<String, u32>,
    duplicate_width: usize,
}

impl NameAllocator {
    fn new(duplicate_width: usize) -> Self {
        Self {
            duplicate_width,
            ..Self::default()
        }
    }

    /// Returns the allocated name and the duplicate tag, if one was needed.
    fn allocate(&mut self, base: &str) -> (String, Option<SuffixTag>) {
        let key = base.to_lowercase();
        if self.taken.insert(key.clone()) {
            return (base.to_string(), None);
        }

        let next = self.next_duplicate.entry(key).or_insert(1);
        loop {
            let tag = SuffixTag::Duplicate {
                number: *next,
                width: self.duplicate_width,
            };
            *next += 1;
            let candidate = format!("{}{}", base, tag);
            if self.taken.insert(candidate.to_lowercase()) {
                return (candidate, Some(tag));
            }
        }
    }
}

/// Builds the full rename plan.
///
/// Pairing completes before any name is produced so that automatic zero-fill
/// can size the counter for the final shot count.
///
/// With renaming disabled, each shot keeps the stem of its first file (the
/// HDR PNG for a pair) and only collisions are renamed.
pub fn plan_renames(
    assets: &[SourceAsset],
    policy: &NamingPolicy,
) -> Result<RenamePlan, PlanError> {
    let numbered = policy.rename_enabled && policy.counter_enabled;
    if policy.rename_enabled {
        validate_prefix(&policy.prefix, policy.counter_enabled)?;
    }

    let (groups, mut warnings) = group_assets(assets, policy.start)?;

    let last_ordinal = groups.last().map(|g| g.ordinal).unwrap_or(policy.start);
    let width = if numbered {
        counter_width(policy.zero_fill, last_ordinal)?
    } else {
        0
    };

    let mut allocator = NameAllocator::new(width.max(MIN_DUPLICATE_WIDTH));
    let mut group_names: Vec<(String, Vec<SuffixTag>)> = Vec::with_capacity(groups.len());

    for group in &groups {
        let mut tags = Vec::new();
        let base = if policy.rename_enabled {
            let mut base = policy.prefix.clone();
            if numbered {
                base.push_str(&format!("{:0width$}", group.ordinal, width = width));
            }
            if group.range == DynamicRange::Hdr {
                base.push_str(&SuffixTag::Hdr.to_string());
                tags.push(SuffixTag::Hdr);
            }
            base
        } else {
            group
                .members
                .first()
                .and_then(|&m| assets.get(m))
                .map(SourceAsset::stem)
                .unwrap_or_default()
        };

        let (name, duplicate) = allocator.allocate(&base);
        if let Some(tag) = duplicate {
            tags.push(tag);
            warnings.push(PlanWarning::DuplicateName {
                basename: base,
                assigned: name.clone(),
            });
        }
        group_names.push((name, tags));
    }

    let mut group_of = vec![0usize; assets.len()];
    for (g, group) in groups.iter().enumerate() {
        for &member in &group.members {
            if let Some(slot) = group_of.get_mut(member) {
                *slot = g;
            }
        }
    }

    let entries = assets
        .iter()
        .map(|asset| {
            let g = group_of.get(asset.index).copied().unwrap_or_default();
            let (basename, tags) = &group_names[g];
            RenamePlanEntry {
                source: asset.clone(),
                group: g,
                ordinal: groups[g].ordinal,
                basename: basename.clone(),
                extension: asset.format.extension(),
                tags: tags.clone(),
            }
        })
        .collect();

    Ok(RenamePlan {
        entries,
        groups,
        counter_width: width,
        warnings,
    })
}

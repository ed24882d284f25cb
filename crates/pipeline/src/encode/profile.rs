//! Encoder argument recipes.
//!
//! Each (codec, dynamic range) pair maps to a [`Profile`]: an ordered list of
//! external program invocations whose arguments are templates. Adding a codec
//! means adding a table entry here.

use super::{Codec, EncodingJob, ExternalCommand};
use crate::capability::Capabilities;
use crate::classify::DynamicRange;
use std::ffi::OsString;

pub const FFMPEG: &str = "ffmpeg";
pub const CJPEG: &str = "cjpeg";
pub const CJXL: &str = "cjxl";
pub const HEIF_ENC: &str = "heif-enc";
pub const AVIFENC: &str = "avifenc";

/// One argument template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    Lit(&'static str),
    /// The renamed source PNG.
    Input,
    /// The job's temporary output file.
    Output,
    /// The quality value.
    Quality,
    /// `key=<quality>`.
    QualityParam(&'static str),
    /// Scratch file shared between the steps of one job.
    Intermediate,
}

/// One program invocation within a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub program: &'static str,
    pub args: &'static [Arg],
}

/// The recipe for one codec and dynamic range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub codec: Codec,
    pub range: DynamicRange,
    pub steps: &'static [Step],
}

impl Profile {
    pub fn uses_intermediate(&self) -> bool {
        self.steps
            .iter()
            .any(|step| step.args.contains(&Arg::Intermediate))
    }
}

use Arg::{Input, Intermediate, Lit, Output, Quality, QualityParam};

const JPEG_SDR: &[Step] = &[
    Step {
        program: FFMPEG,
        args: &[Lit("-y"), Lit("-i"), Input, Lit("-pix_fmt"), Lit("rgb24"), Intermediate],
    },
    Step {
        program: CJPEG,
        args: &[
            Lit("-quality"),
            Quality,
            Lit("-optimize"),
            Lit("-precision"),
            Lit("8"),
            Lit("-outfile"),
            Output,
            Intermediate,
        ],
    },
];

const JXL_SDR: &[Step] = &[Step {
    program: CJXL,
    args: &[
        Input,
        Output,
        Lit("--quality"),
        Quality,
        Lit("--effort"),
        Lit("7"),
        Lit("--brotli_effort"),
        Lit("11"),
        Lit("--num_threads"),
        Lit("-1"),
        Lit("--gaborish"),
        Lit("1"),
    ],
}];

const JXL_HDR: &[Step] = &[Step {
    program: CJXL,
    args: &[
        Input,
        Output,
        Lit("--quality"),
        Quality,
        Lit("--effort"),
        Lit("7"),
        Lit("--brotli_effort"),
        Lit("11"),
        Lit("--num_threads"),
        Lit("-1"),
        Lit("--gaborish"),
        Lit("1"),
        Lit("-x"),
        Lit("color_space=RGB_D65_202_Rel_PeQ"),
    ],
}];

// 8-bit BT.601 matrix with BT.709 primaries and sRGB transfer
const HEIC_SDR: &[Step] = &[Step {
    program: HEIF_ENC,
    args: &[
        Lit("--thumb"),
        Lit("off"),
        Lit("--no-alpha"),
        Lit("--no-thumb-alpha"),
        Lit("--bit-depth"),
        Lit("8"),
        Lit("--quality"),
        Quality,
        Lit("--matrix_coefficients"),
        Lit("6"),
        Lit("--colour_primaries"),
        Lit("1"),
        Lit("--transfer_characteristic"),
        Lit("13"),
        Lit("--full_range_flag"),
        Lit("1"),
        Lit("--encoder"),
        Lit("x265"),
        Lit("-p"),
        QualityParam("quality="),
        Lit("-p"),
        Lit("preset=slow"),
        Lit("-p"),
        Lit("tune=ssim"),
        Lit("-p"),
        Lit("complexity=80"),
        Lit("-p"),
        Lit("chroma=420"),
        Lit("--output"),
        Output,
        Input,
    ],
}];

// 10-bit BT.2020 matrix and primaries
const HEIC_HDR: &[Step] = &[Step {
    program: HEIF_ENC,
    args: &[
        Lit("--thumb"),
        Lit("off"),
        Lit("--no-alpha"),
        Lit("--no-thumb-alpha"),
        Lit("--bit-depth"),
        Lit("10"),
        Lit("--quality"),
        Quality,
        Lit("--matrix_coefficients"),
        Lit("9"),
        Lit("--colour_primaries"),
        Lit("9"),
        Lit("--transfer_characteristic"),
        Lit("13"),
        Lit("--full_range_flag"),
        Lit("1"),
        Lit("--encoder"),
        Lit("x265"),
        Lit("-p"),
        QualityParam("quality="),
        Lit("-p"),
        Lit("preset=slow"),
        Lit("-p"),
        Lit("tune=ssim"),
        Lit("-p"),
        Lit("complexity=80"),
        Lit("-p"),
        Lit("chroma=420"),
        Lit("--output"),
        Output,
        Input,
    ],
}];

const AVIF_SDR: &[Step] = &[Step {
    program: AVIFENC,
    args: &[
        Lit("--codec"),
        Lit("aom"),
        Lit("--speed"),
        Lit("6"),
        Lit("--qcolor"),
        Quality,
        Lit("--yuv"),
        Lit("420"),
        Lit("--range"),
        Lit("full"),
        Lit("--depth"),
        Lit("8"),
        Lit("--cicp"),
        Lit("1/13/6"),
        Lit("--jobs"),
        Lit("all"),
        Lit("--ignore-icc"),
        Lit("--advanced"),
        Lit("enable-chroma-deltaq=1"),
        Input,
        Output,
    ],
}];

// CICP 9/16/9: BT.2020 primaries, PQ transfer, BT.2020 matrix
const AVIF_HDR: &[Step] = &[Step {
    program: AVIFENC,
    args: &[
        Lit("--codec"),
        Lit("aom"),
        Lit("--speed"),
        Lit("6"),
        Lit("--qcolor"),
        Quality,
        Lit("--yuv"),
        Lit("420"),
        Lit("--range"),
        Lit("full"),
        Lit("--depth"),
        Lit("10"),
        Lit("--cicp"),
        Lit("9/16/9"),
        Lit("--jobs"),
        Lit("all"),
        Lit("--ignore-icc"),
        Lit("--advanced"),
        Lit("enable-chroma-deltaq=1"),
        Input,
        Output,
    ],
}];

static PROFILES: &[Profile] = &[
    Profile { codec: Codec::Jpeg, range: DynamicRange::Sdr, steps: JPEG_SDR },
    Profile { codec: Codec::JpegXl, range: DynamicRange::Sdr, steps: JXL_SDR },
    Profile { codec: Codec::JpegXl, range: DynamicRange::Hdr, steps: JXL_HDR },
    Profile { codec: Codec::Heic, range: DynamicRange::Sdr, steps: HEIC_SDR },
    Profile { codec: Codec::Heic, range: DynamicRange::Hdr, steps: HEIC_HDR },
    Profile { codec: Codec::Avif, range: DynamicRange::Sdr, steps: AVIF_SDR },
    Profile { codec: Codec::Avif, range: DynamicRange::Hdr, steps: AVIF_HDR },
];

/// Looks up the recipe for a codec and range.
pub fn profile_for(codec: Codec, range: DynamicRange) -> Option<&'static Profile> {
    PROFILES
        .iter()
        .find(|p| p.codec == codec && p.range == range)
}

/// Expands a job's profile into concrete commands.
///
/// Programs are spawned through the paths resolved by the capability probe.
/// Returns `None` when the codec has no recipe for the job's range.
pub fn build_commands(job: &EncodingJob, capabilities: &Capabilities) -> Option<Vec<ExternalCommand>> {
    let profile = profile_for(job.codec, job.range)?;
    let output = job.partial_path();
    let intermediate = job.intermediate_path();

    let commands = profile
        .steps
        .iter()
        .map(|step| ExternalCommand {
            program: capabilities.tool_path(step.program),
            args: step
                .args
                .iter()
                .map(|arg| match arg {
                    Lit(s) => OsString::from(*s),
                    Input => job.source.clone().into_os_string(),
                    Output => output.clone().into_os_string(),
                    Quality => OsString::from(job.quality.to_string()),
                    QualityParam(key) => OsString::from(format!("{}{}", key, job.quality)),
                    Intermediate => intermediate.clone().into_os_string(),
                })
                .collect(),
        })
        .collect();

    Some(commands)
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn get_command_args(cmd: &ExternalCommand) -> Vec<String> {
        cmd.args
            .iter()
            .filter_map(|arg| arg.to_str().map(String::from))
            .collect()
    }

    fn has_flag_with_value(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|pair| pair[0] == flag && pair[1] == value)
    }

    fn job(codec: Codec, range: DynamicRange, quality: u32) -> EncodingJob {
        let name = match range {
            DynamicRange::Sdr => "Image_01.png",
            DynamicRange::Hdr => "Image_01_HDR.png",
        };
        EncodingJob::new(0, PathBuf::from("/shoot/output").join(name), codec, range, quality)
    }

    #[test]
    fn test_every_legal_pair_has_a_profile() {
        for codec in Codec::ALL {
            for range in [DynamicRange::Sdr, DynamicRange::Hdr] {
                assert_eq!(
                    profile_for(codec, range).is_some(),
                    codec.supports(range),
                    "{} {}",
                    codec,
                    range
                );
            }
        }
    }

    #[test]
    fn test_profile_programs_match_required_tools() {
        for profile in PROFILES {
            let programs: Vec<&str> = profile.steps.iter().map(|s| s.program).collect();
            assert_eq!(programs, profile.codec.required_tools());
        }
    }

    #[test]
    fn test_only_jpeg_uses_intermediate() {
        for profile in PROFILES {
            assert_eq!(profile.uses_intermediate(), profile.codec == Codec::Jpeg);
        }
    }

    #[test]
    fn test_jpeg_two_step_recipe() {
        let caps = Capabilities::default();
        let commands = build_commands(&job(Codec::Jpeg, DynamicRange::Sdr, 95), &caps).unwrap();
        assert_eq!(commands.len(), 2);

        let ffmpeg = get_command_args(&commands[0]);
        assert_eq!(
            ffmpeg,
            vec![
                "-y",
                "-i",
                "/shoot/output/Image_01.png",
                "-pix_fmt",
                "rgb24",
                "/shoot/output/Image_01.partial.bmp"
            ]
        );

        let cjpeg = get_command_args(&commands[1]);
        assert!(has_flag_with_value(&cjpeg, "-quality", "95"));
        assert!(has_flag_with_value(&cjpeg, "-outfile", "/shoot/output/Image_01.partial.jpg"));
        assert_eq!(cjpeg.last().map(String::as_str), Some("/shoot/output/Image_01.partial.bmp"));
        assert_eq!(commands[1].program, PathBuf::from("cjpeg"));
    }

    #[test]
    fn test_jpeg_has_no_hdr_recipe() {
        let caps = Capabilities::default();
        assert!(build_commands(&job(Codec::Jpeg, DynamicRange::Hdr, 95), &caps).is_none());
    }

    #[test]
    fn test_hdr_metadata_flags() {
        let caps = Capabilities::default();

        let jxl = get_command_args(&build_commands(&job(Codec::JpegXl, DynamicRange::Hdr, 99), &caps).unwrap()[0]);
        assert!(has_flag_with_value(&jxl, "-x", "color_space=RGB_D65_202_Rel_PeQ"));
        let jxl_sdr = get_command_args(&build_commands(&job(Codec::JpegXl, DynamicRange::Sdr, 99), &caps).unwrap()[0]);
        assert!(!jxl_sdr.iter().any(|a| a == "-x"));

        let heic = get_command_args(&build_commands(&job(Codec::Heic, DynamicRange::Hdr, 90), &caps).unwrap()[0]);
        assert!(has_flag_with_value(&heic, "--bit-depth", "10"));
        assert!(has_flag_with_value(&heic, "--matrix_coefficients", "9"));
        assert!(has_flag_with_value(&heic, "--colour_primaries", "9"));
        assert!(has_flag_with_value(&heic, "-p", "quality=90"));
        assert!(has_flag_with_value(&heic, "--output", "/shoot/output/Image_01_HDR.partial.heic"));
        assert_eq!(heic.last().map(String::as_str), Some("/shoot/output/Image_01_HDR.png"));

        let avif = get_command_args(&build_commands(&job(Codec::Avif, DynamicRange::Hdr, 80), &caps).unwrap()[0]);
        assert!(has_flag_with_value(&avif, "--depth", "10"));
        assert!(has_flag_with_value(&avif, "--cicp", "9/16/9"));
        let avif_sdr = get_command_args(&build_commands(&job(Codec::Avif, DynamicRange::Sdr, 80), &caps).unwrap()[0]);
        assert!(has_flag_with_value(&avif_sdr, "--depth", "8"));
        assert!(has_flag_with_value(&avif_sdr, "--cicp", "1/13/6"));
    }

    // Every recipe carries the quality value, reads the source and writes
    // only to the job's temporary output.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_commands_carry_quality_and_paths(
            codec_idx in 0usize..4,
            hdr in proptest::bool::ANY,
            quality in 0u32..=100,
        ) {
            let codec = Codec::ALL[codec_idx];
            let range = if hdr { DynamicRange::Hdr } else { DynamicRange::Sdr };
            prop_assume!(codec.supports(range));

            let job = job(codec, range, quality);
            let commands = build_commands(&job, &Capabilities::default()).unwrap();
            let all_args: Vec<String> = commands.iter().flat_map(get_command_args).collect();

            let source = job.source.to_string_lossy().into_owned();
            let partial = job.partial_path().to_string_lossy().into_owned();
            let destination = job.destination.to_string_lossy().into_owned();
            let q = quality.to_string();

            prop_assert!(all_args.contains(&source));
            prop_assert!(all_args.contains(&partial));
            prop_assert!(!all_args.contains(&destination));
            let param_suffix = format!("={}", q);
            let quality_passed = all_args.iter().any(|a| *a == q || a.ends_with(&param_suffix));
            prop_assert!(quality_passed);
        }
    }
}

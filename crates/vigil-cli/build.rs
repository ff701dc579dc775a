//! Build script: render the vigil manual page into OUT_DIR and
//! target/generated-man/<target>/<profile> for release packaging.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use clap::CommandFactory;
use clap_mangen::Man;
use time::OffsetDateTime;
use time::format_description::well_known::Iso8601;

#[path = "src/cli.rs"]
mod cli;

const FALLBACK_DATE: &str = "1970-01-01";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-env-changed=TARGET");
    println!("cargo:rerun-if-env-changed=PROFILE");

    let cmd = cli::Cli::command();
    let binary_name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| cmd.get_name().to_owned());
    let version = env::var("CARGO_PKG_VERSION")
        .map_err(|_| "CARGO_PKG_VERSION must be set by Cargo to render the manual page")?;

    let man = Man::new(cmd)
        .section("8")
        .source(format!("{binary_name} {version}"))
        .date(manual_date());
    let mut page = Vec::new();
    man.render(&mut page)?;
    let page_name = format!("{binary_name}.8");

    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        return Ok(());
    };
    write_man_page(&page, &out_dir, &page_name)?;

    let target = env::var("TARGET").unwrap_or_else(|_| "unknown-target".into());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".into());
    if let Some(target_dir) = workspace_target_dir(&out_dir) {
        let packaged = target_dir.join(format!("generated-man/{target}/{profile}"));
        if let Err(err) = write_man_page(&page, &packaged, &page_name) {
            println!(
                "cargo:warning=Failed to stage manual page in {}: {err}",
                packaged.display()
            );
        }
    }
    Ok(())
}

/// Formats SOURCE_DATE_EPOCH as an ISO date, falling back to the epoch.
fn manual_date() -> String {
    let Ok(raw) = env::var("SOURCE_DATE_EPOCH") else {
        return FALLBACK_DATE.into();
    };
    let formatted = raw
        .parse::<i64>()
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|value| value.format(&Iso8601::DATE).ok());
    formatted.unwrap_or_else(|| {
        println!("cargo:warning=Invalid SOURCE_DATE_EPOCH '{raw}'; using {FALLBACK_DATE}");
        FALLBACK_DATE.into()
    })
}

fn workspace_target_dir(out_dir: &Path) -> Option<PathBuf> {
    out_dir
        .ancestors()
        .find(|dir| dir.file_name().and_then(|name| name.to_str()) == Some("target"))
        .map(Path::to_path_buf)
}

fn write_man_page(data: &[u8], dir: &Path, page_name: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let tmp = dir.join(format!("{page_name}.tmp"));
    fs::write(&tmp, data)?;
    fs::rename(&tmp, dir.join(page_name))
}

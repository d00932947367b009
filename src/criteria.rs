use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::CriteriaArgs;
use crate::config::HarvestConfig;
use crate::formats::SearchCriterion;

pub fn run(args: CriteriaArgs) -> anyhow::Result<()> {
    let config = match args.config.as_deref() {
        Some(path) => HarvestConfig::load(Path::new(path))?,
        None => HarvestConfig::default(),
    };
    let criteria = config.criteria();

    match args.out {
        Some(out) => {
            let out = PathBuf::from(out);
            if out.exists() && !args.force {
                anyhow::bail!("criteria output already exists: {}", out.display());
            }
            let mut buf = Vec::new();
            write_criteria(&mut buf, &criteria, &config)?;
            std::fs::write(&out, buf)
                .with_context(|| format!("write criteria: {}", out.display()))?;
            tracing::info!(out = %out.display(), criteria = criteria.len(), "criteria written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_criteria(&mut lock, &criteria, &config)?;
            lock.flush().context("flush stdout")?;
        }
    }

    Ok(())
}

fn write_criteria<W: std::io::Write>(
    mut w: W,
    criteria: &[SearchCriterion],
    config: &HarvestConfig,
) -> anyhow::Result<()> {
    let header = ["classification", "language", "language_code"].map(str::to_owned);
    crate::export::write_row(&mut w, &header, ',').context("write criteria header")?;
    for criterion in criteria {
        let code = config
            .language_code(&criterion.language)
            .unwrap_or_default()
            .to_owned();
        let row = [
            criterion.classification.clone(),
            criterion.language.clone(),
            code,
        ];
        crate::export::write_row(&mut w, &row, ',').context("write criterion row")?;
    }
    Ok(())
}

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod error;
mod exclusions;
mod export;
mod filter;
mod loader;
mod models;
mod paginate;
mod query;
mod rank;
mod report;
mod server;

use config::AppConfig;
use query::{Dashboard, PreparedView, QueryParams};

#[derive(Parser)]
#[command(name = "enrollment-dashboard")]
#[command(about = "Enrollment opportunity dashboard: filters, class confirmation and course rankings", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: AppConfig,
    #[command(subcommand)]
    command: Commands,
}

/// Same names and semantics as the HTTP query string.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long)]
    curso: Option<String>,
    #[arg(long)]
    campus: Option<String>,
    #[arg(long)]
    turno: Option<String>,
    #[arg(long)]
    modelo: Option<String>,
    #[arg(long)]
    fase: Option<String>,
    /// Case-insensitive substring search
    #[arg(long)]
    busca: Option<String>,
    /// sim | nao
    #[arg(long)]
    flag_financeira: Option<String>,
    /// sim | nao
    #[arg(long)]
    flag_documentacao: Option<String>,
    /// sim | nao
    #[arg(long)]
    flag_academica: Option<String>,
}

impl FilterArgs {
    fn to_query(&self) -> HashMap<String, String> {
        [
            ("curso", &self.curso),
            ("campus", &self.campus),
            ("turno", &self.turno),
            ("modelo", &self.modelo),
            ("fase", &self.fase),
            ("busca", &self.busca),
            ("flagFinanceira", &self.flag_financeira),
            ("flagDocumentacao", &self.flag_documentacao),
            ("flagAcademica", &self.flag_academica),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
        .collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard JSON API
    Serve {
        #[arg(long, env = "DASHBOARD_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
    /// Print headline numbers and top courses
    Summary {
        #[arg(long, default_value = "turmas")]
        view: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "turmas")]
        view: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the ordered class table as CSV
    Export {
        #[arg(long, default_value = "turmas")]
        view: String,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        out: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn find_view<'a>(dashboard: &'a Dashboard, name: &str) -> anyhow::Result<&'a PreparedView> {
    dashboard.view(name).with_context(|| {
        let known: Vec<&str> = dashboard
            .views()
            .iter()
            .map(|v| v.config.name.as_str())
            .collect();
        format!("unknown view `{name}` (available: {})", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.config.log_json);
    let dashboard = cli.config.load_dashboard()?;

    match cli.command {
        Commands::Serve { bind } => {
            server::serve(Arc::new(dashboard), bind).await?;
        }
        Commands::Summary {
            view,
            filters,
            limit,
        } => {
            let view = find_view(&dashboard, &view)?;
            let params = QueryParams::from_query(&filters.to_query());
            let evaluation = dashboard.evaluate(view, &params);

            if evaluation.records.is_empty() {
                println!("No records match these filters.");
                return Ok(());
            }

            for line in report::summary_lines(&evaluation, limit) {
                println!("{line}");
            }
        }
        Commands::Report { view, filters, out } => {
            let view = find_view(&dashboard, &view)?;
            let params = QueryParams::from_query(&filters.to_query());
            let evaluation = dashboard.evaluate(view, &params);
            let report =
                report::build_report(&view.config.name, &params.filters, Utc::now(), &evaluation);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { view, filters, out } => {
            let view = find_view(&dashboard, &view)?;
            let params = QueryParams::from_query(&filters.to_query());
            let evaluation = dashboard.evaluate(view, &params);
            let written = export::export_classes(&out, &evaluation.classes)?;
            println!("Exported {written} classes to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_flags_map_to_query_names() {
        let cli = Cli::parse_from([
            "enrollment-dashboard",
            "--data",
            "oportunidades.json",
            "summary",
            "--curso",
            "Direito",
            "--flag-academica",
            "sim",
        ]);
        let Commands::Summary { filters, limit, .. } = cli.command else {
            panic!("expected summary");
        };
        let query = filters.to_query();
        assert_eq!(query.get("curso").map(String::as_str), Some("Direito"));
        assert_eq!(query.get("flagAcademica").map(String::as_str), Some("sim"));
        assert_eq!(query.len(), 2);
        assert_eq!(limit, 10);
        assert_eq!(cli.config.break_even, query::DEFAULT_BREAK_EVEN);
    }
}

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::policy::{ProtectedArea, Role, PUBLIC_ROUTES};

#[derive(Debug, Serialize)]
pub struct AreaReport {
    pub area: ProtectedArea,
    pub prefix: &'static str,
    /// `None` marks an area without a policy entry.
    pub allowed_roles: Option<Vec<Role>>,
}

#[derive(Debug, Serialize)]
pub struct RoutesReport {
    pub public: Vec<&'static str>,
    pub protected: Vec<AreaReport>,
}

pub fn report() -> RoutesReport {
    RoutesReport {
        public: PUBLIC_ROUTES.to_vec(),
        protected: ProtectedArea::ALL
            .into_iter()
            .map(|area| AreaReport {
                area,
                prefix: area.prefix(),
                allowed_roles: area.allowed_roles(),
            })
            .collect(),
    }
}

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let report = report();

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("Public routes:");
            for route in &report.public {
                println!("  {}", route);
            }

            println!("Protected areas:");
            for area in &report.protected {
                let roles = match &area.allowed_roles {
                    Some(roles) => roles
                        .iter()
                        .map(Role::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                    None => "UNLISTED (any signed-in user)".to_string(),
                };
                println!("  {:<12} {}", area.prefix, roles);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_area_once() {
        let report = report();
        assert_eq!(report.protected.len(), ProtectedArea::ALL.len());
        assert!(report.public.contains(&"/login"));

        let onboarding = report
            .protected
            .iter()
            .find(|a| a.area == ProtectedArea::Onboarding)
            .unwrap();
        assert!(onboarding.allowed_roles.is_none());
    }
}

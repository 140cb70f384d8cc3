use serde::Serialize;

use crate::cli::OutputFormat;
use crate::policy::{
    can_access_route, gate_exempt, policy_entry, ProtectedArea, Role, RouteClass,
};

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub path: String,
    pub classification: &'static str,
    pub area: Option<ProtectedArea>,
    pub policy_entry: Option<ProtectedArea>,
    pub allowed_roles: Option<Vec<Role>>,
    pub role: Option<Role>,
    pub can_access: bool,
    pub gate_exempt: bool,
}

pub fn check(path: &str, role: Option<Role>) -> CheckReport {
    let (classification, area) = match RouteClass::classify(path) {
        RouteClass::Public { confirmation: true } => ("public (confirmation)", None),
        RouteClass::Public { confirmation: false } => ("public", None),
        RouteClass::Guarded(area) => ("protected", Some(area)),
        RouteClass::Unlisted => ("unlisted", None),
    };
    let entry = policy_entry(path);

    CheckReport {
        path: path.to_string(),
        classification,
        area,
        policy_entry: entry,
        allowed_roles: entry.and_then(ProtectedArea::allowed_roles),
        role,
        can_access: can_access_route(role, path),
        gate_exempt: gate_exempt(path),
    }
}

pub fn handle(path: &str, role: Option<Role>, output_format: OutputFormat) -> anyhow::Result<()> {
    let report = check(path, role);

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("Path:           {}", report.path);
            println!("Classification: {}", report.classification);
            if report.gate_exempt {
                println!("Gate:           exempt (never evaluated)");
            }
            match report.policy_entry {
                Some(entry) => println!("Policy entry:   {}", entry.prefix()),
                None => println!("Policy entry:   none (open to any signed-in user)"),
            }
            let role = report.role.map(|r| r.as_str()).unwrap_or("<none>");
            let verdict = if report.can_access { "allowed" } else { "denied" };
            println!("Role {:<10} {}", role, verdict);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_admin_path_for_manager() {
        let report = check("/admin/users", Some(Role::Manager));
        assert_eq!(report.classification, "protected");
        assert_eq!(report.policy_entry, Some(ProtectedArea::Admin));
        assert!(!report.can_access);
    }

    #[test]
    fn checks_unlisted_path() {
        let report = check("/reports", Some(Role::Staff));
        assert_eq!(report.classification, "unlisted");
        assert!(report.policy_entry.is_none());
        assert!(report.allowed_roles.is_none());
        assert!(report.can_access);
    }
}

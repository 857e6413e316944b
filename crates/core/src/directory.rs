use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::DirectoryConfig;

/// Read-only view of the organisation: who is an admin, who reports to whom.
pub trait Directory: Send + Sync {
    fn is_admin(&self, email: &str) -> bool;
    fn manager_of(&self, email: &str) -> Option<String>;
    fn holiday_region_of(&self, email: &str) -> Option<String>;
    fn admins(&self) -> Vec<String>;
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub email: String,
    pub manager_email: Option<String>,
    pub holiday_region: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    admins: BTreeSet<String>,
    employees: HashMap<String, EmployeeProfile>,
}

impl StaticDirectory {
    pub fn from_config(config: &DirectoryConfig) -> Self {
        let mut directory = Self::default();
        for admin in &config.admin_users {
            directory = directory.with_admin(admin);
        }
        for employee in &config.employees {
            directory = directory.with_employee(
                &employee.email,
                employee.manager_email.as_deref(),
                employee.holiday_region.as_deref(),
            );
        }
        directory
    }

    pub fn with_admin(mut self, email: &str) -> Self {
        let email = normalize_email(email);
        if !email.is_empty() {
            self.admins.insert(email);
        }
        self
    }

    pub fn with_employee(
        mut self,
        email: &str,
        manager_email: Option<&str>,
        holiday_region: Option<&str>,
    ) -> Self {
        let email = normalize_email(email);
        self.employees.insert(
            email.clone(),
            EmployeeProfile {
                email,
                manager_email: manager_email.map(normalize_email).filter(|m| !m.is_empty()),
                holiday_region: holiday_region
                    .map(|region| region.trim().to_string())
                    .filter(|region| !region.is_empty()),
            },
        );
        self
    }

    pub fn employee(&self, email: &str) -> Option<&EmployeeProfile> {
        self.employees.get(&normalize_email(email))
    }

    pub fn employee_count(&self) -> usize {
        self.employees.len()
    }
}

impl Directory for StaticDirectory {
    fn is_admin(&self, email: &str) -> bool {
        self.admins.contains(&normalize_email(email))
    }

    fn manager_of(&self, email: &str) -> Option<String> {
        self.employee(email).and_then(|profile| profile.manager_email.clone())
    }

    fn holiday_region_of(&self, email: &str) -> Option<String> {
        self.employee(email).and_then(|profile| profile.holiday_region.clone())
    }

    fn admins(&self) -> Vec<String> {
        self.admins.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Directory, StaticDirectory};
    use crate::config::{DirectoryConfig, EmployeeEntry};

    #[test]
    fn lookups_are_case_insensitive() {
        let directory = StaticDirectory::default()
            .with_admin(" Admin@Corp.test ")
            .with_employee("Ana@corp.test", Some("MO@corp.test"), Some("madrid"));

        assert!(directory.is_admin("admin@corp.test"));
        assert_eq!(directory.manager_of("ana@CORP.test").as_deref(), Some("mo@corp.test"));
        assert_eq!(directory.holiday_region_of("ana@corp.test").as_deref(), Some("madrid"));
        assert!(directory.manager_of("ghost@corp.test").is_none());
    }

    #[test]
    fn builds_from_config_section() {
        let config = DirectoryConfig {
            admin_users: vec!["root@corp.test".to_string(), "hr@corp.test".to_string()],
            employees: vec![EmployeeEntry {
                email: "ana@corp.test".to_string(),
                manager_email: Some("mo@corp.test".to_string()),
                holiday_region: None,
            }],
        };
        let directory = StaticDirectory::from_config(&config);

        assert_eq!(directory.admins(), vec!["hr@corp.test", "root@corp.test"]);
        assert_eq!(directory.employee_count(), 1);
        assert!(directory.holiday_region_of("ana@corp.test").is_none());
    }
}

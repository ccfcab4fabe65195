//! Role-based access: the role → permission table.
//!
//! Identity arrives on each request as a role header (plus an optional
//! email); this module only answers "may this role do that".

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    NurseHospital,
    DoctorUrgency,
    ViewerCensus,
    Viewer,
}

impl Role {
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "nurse_hospital" => Some(Self::NurseHospital),
            "doctor_urgency" => Some(Self::DoctorUrgency),
            "viewer_census" => Some(Self::ViewerCensus),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::NurseHospital => "nurse_hospital",
            Self::DoctorUrgency => "doctor_urgency",
            Self::ViewerCensus => "viewer_census",
            Self::Viewer => "viewer",
        }
    }

    #[must_use]
    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Self::Admin => &[
                ViewCensus,
                EditBeds,
                EditHandoff,
                EditMedicalHandoff,
                SignMedicalHandoff,
                ManageDays,
                SendEmail,
                ViewAudit,
                DownloadReports,
            ],
            Self::NurseHospital => &[ViewCensus, EditBeds, EditHandoff, ManageDays, SendEmail, DownloadReports],
            Self::DoctorUrgency => &[ViewCensus, EditMedicalHandoff, SignMedicalHandoff],
            Self::ViewerCensus => &[ViewCensus, DownloadReports],
            Self::Viewer => &[ViewCensus],
        }
    }

    #[must_use]
    pub fn can(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Permission {
    ViewCensus,
    EditBeds,
    EditHandoff,
    EditMedicalHandoff,
    SignMedicalHandoff,
    ManageDays,
    SendEmail,
    ViewAudit,
    DownloadReports,
}

impl Permission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewCensus => "ViewCensus",
            Self::EditBeds => "EditBeds",
            Self::EditHandoff => "EditHandoff",
            Self::EditMedicalHandoff => "EditMedicalHandoff",
            Self::SignMedicalHandoff => "SignMedicalHandoff",
            Self::ManageDays => "ManageDays",
            Self::SendEmail => "SendEmail",
            Self::ViewAudit => "ViewAudit",
            Self::DownloadReports => "DownloadReports",
        }
    }
}

/// Who is acting on a request. Recorded in audit entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub role: Role,
    pub email: Option<String>,
}

impl Actor {
    #[must_use]
    pub fn new(role: Role, email: Option<String>) -> Self {
        Self { role, email }
    }

    #[cfg(test)]
    #[must_use]
    pub fn system() -> Self {
        Self { role: Role::Admin, email: None }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

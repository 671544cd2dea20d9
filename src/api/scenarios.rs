//! Canned demo requests for the front end.

use serde::Serialize;

use crate::pipeline::types::{ClearanceLevel, EmailRequest};
use crate::store::memory::seed_users;

/// A pre-configured request with its expected outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DemoScenario {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub request: EmailRequest,
    pub expected_outcome: &'static str,
}

/// A demo user the front end can pick as sender.
#[derive(Debug, Clone, Serialize)]
pub struct DemoUser {
    pub email: String,
    pub name: String,
    pub role: String,
    pub clearance: ClearanceLevel,
}

/// Payload of `GET /demo-scenarios`.
#[derive(Debug, Clone, Serialize)]
pub struct DemoCatalog {
    pub scenarios: Vec<DemoScenario>,
    pub available_users: Vec<DemoUser>,
}

pub fn demo_catalog() -> DemoCatalog {
    let scenarios = vec![
        DemoScenario {
            id: "approved_standard",
            name: "✅ Approved Request (Standard User)",
            description: "Senior Engineer requests API documentation",
            request: EmailRequest::new(
                "john.doe@company.com",
                "API Documentation Request",
                "Hey, I need the API documentation for the new endpoints we're working with.",
            ),
            expected_outcome: "Approved - User has standard clearance",
        },
        DemoScenario {
            id: "denied_intern",
            name: "❌ Denied Request (Insufficient Clearance)",
            description: "Intern tries to access financial report",
            request: EmailRequest::new(
                "intern@company.com",
                "Financial Report",
                "Can I get the Q4 2024 financial report? I need it for my analysis project.",
            ),
            expected_outcome: "Denied - Requires executive clearance",
        },
        DemoScenario {
            id: "approved_executive",
            name: "🔐 Approved Executive Access",
            description: "CFO requests sensitive financial data",
            request: EmailRequest::new(
                "cfo@company.com",
                "Q4 Financial Review",
                "I need to review our quarterly financial performance and revenue breakdown.",
            ),
            expected_outcome: "Approved - Executive has full access",
        },
    ];

    let available_users = seed_users()
        .into_iter()
        .map(|(email, profile)| DemoUser {
            email,
            name: profile.name,
            role: profile.role,
            clearance: profile.clearance,
        })
        .collect();

    DemoCatalog {
        scenarios,
        available_users,
    }
}

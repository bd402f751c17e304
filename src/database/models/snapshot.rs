use serde::{Deserialize, Serialize};

use super::{Case, Client, Expense, Fee, Financials, ScopeData, Settings};

/// Everything the CRM needs on startup, as served by `GET /api/bootstrap`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bootstrap {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub cases: Vec<Case>,
    #[serde(default)]
    pub fees: Vec<Fee>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub settings: Settings,
}

impl Bootstrap {
    pub fn from_scopes(scopes: impl IntoIterator<Item = ScopeData>) -> Self {
        let mut snapshot = Bootstrap::default();
        for data in scopes {
            match data {
                ScopeData::Clients(clients) => snapshot.clients = clients,
                ScopeData::Cases(cases) => snapshot.cases = cases,
                ScopeData::Financials(financials) => {
                    snapshot.fees = financials.fees;
                    snapshot.expenses = financials.expenses;
                }
                ScopeData::Settings(settings) => snapshot.settings = settings,
            }
        }
        snapshot
    }

    pub fn into_scopes(self) -> Vec<ScopeData> {
        vec![
            ScopeData::Clients(self.clients),
            ScopeData::Cases(self.cases),
            ScopeData::Financials(Financials { fees: self.fees, expenses: self.expenses }),
            ScopeData::Settings(self.settings),
        ]
    }
}

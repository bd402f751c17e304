//! Local mirrors of the server scopes. Each store is replaced wholesale with
//! what the server returned; nothing is edited speculatively.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::aggregates::{self, FinancialTotals, UrgentTask};
use crate::database::models::{Case, Client, Expense, Fee, Financials, Settings};

#[derive(Debug, Clone, Default)]
pub struct ClientsStore {
    clients: Vec<Client>,
}

impl ClientsStore {
    pub fn replace(&mut self, clients: Vec<Client>) {
        self.clients = clients;
    }

    pub fn all(&self) -> &[Client] {
        &self.clients
    }

    pub fn get_client_by_id(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CasesStore {
    cases: Vec<Case>,
}

impl CasesStore {
    pub fn replace(&mut self, cases: Vec<Case>) {
        self.cases = cases;
    }

    pub fn all(&self) -> &[Case] {
        &self.cases
    }

    pub fn get_case_by_id(&self, id: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn get_cases_by_client_id(&self, client_id: &str) -> Vec<&Case> {
        self.cases.iter().filter(|c| c.client_id == client_id).collect()
    }

    pub fn get_urgent_tasks(&self, today: NaiveDate, threshold_days: u32) -> Vec<UrgentTask> {
        aggregates::urgent_tasks(&self.cases, today, threshold_days)
    }
}

/// Fees and expenses attached to one case or client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialView<'a> {
    pub fees: Vec<&'a Fee>,
    pub expenses: Vec<&'a Expense>,
}

impl FinancialView<'_> {
    pub fn totals(&self) -> FinancialTotals {
        FinancialTotals::from_entries(self.fees.iter().copied(), self.expenses.iter().copied())
    }
}

#[derive(Debug, Clone, Default)]
struct CaseEntries {
    fees: Vec<usize>,
    expenses: Vec<usize>,
}

/// Financial entries with a case id index rebuilt on every replace
#[derive(Debug, Clone, Default)]
pub struct FinancialStore {
    financials: Financials,
    by_case: HashMap<String, CaseEntries>,
}

impl FinancialStore {
    pub fn replace(&mut self, financials: Financials) {
        let mut by_case: HashMap<String, CaseEntries> = HashMap::new();
        for (i, fee) in financials.fees.iter().enumerate() {
            by_case.entry(fee.case_id.clone()).or_default().fees.push(i);
        }
        for (i, expense) in financials.expenses.iter().enumerate() {
            by_case.entry(expense.case_id.clone()).or_default().expenses.push(i);
        }
        self.financials = financials;
        self.by_case = by_case;
    }

    pub fn fees(&self) -> &[Fee] {
        &self.financials.fees
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.financials.expenses
    }

    pub fn get_financials_by_case_id(&self, case_id: &str) -> FinancialView<'_> {
        let mut view = FinancialView::default();
        self.extend_view(&mut view, case_id);
        view
    }

    pub fn get_financials_by_client_id(&self, client_id: &str, cases: &CasesStore) -> FinancialView<'_> {
        let mut view = FinancialView::default();
        for case in cases.get_cases_by_client_id(client_id) {
            self.extend_view(&mut view, &case.id);
        }
        view
    }

    fn extend_view<'a>(&'a self, view: &mut FinancialView<'a>, case_id: &str) {
        if let Some(entries) = self.by_case.get(case_id) {
            view.fees.extend(entries.fees.iter().map(|&i| &self.financials.fees[i]));
            view.expenses.extend(entries.expenses.iter().map(|&i| &self.financials.expenses[i]));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    settings: Settings,
}

impl SettingsStore {
    pub fn replace(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn urgent_task_threshold_days(&self) -> u32 {
        self.settings.notification_settings.urgent_task_threshold_days
    }
}

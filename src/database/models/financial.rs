use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Entity, Money};

/// Fee type that carries an installment plan
pub const INSTALLMENT_FEE_TYPE: &str = "Parcelado";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    #[serde(default)]
    pub fees: Vec<Fee>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl Financials {
    /// Drop every fee and expense attached to one of `case_ids`
    pub fn remove_by_case_ids(&mut self, case_ids: &[String]) {
        self.fees.retain(|f| !case_ids.contains(&f.case_id));
        self.expenses.retain(|e| !case_ids.contains(&e.case_id));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeStatus {
    #[default]
    #[serde(rename = "Pendente")]
    Pendente,
    #[serde(rename = "Pago")]
    Pago,
    #[serde(rename = "Parcialmente Pago")]
    ParcialmentePago,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallmentStatus {
    #[default]
    #[serde(rename = "Pendente")]
    Pendente,
    #[serde(rename = "Pago")]
    Pago,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub id: String,
    pub case_id: String,
    #[serde(default)]
    pub description: String,
    pub amount: Money,
    pub due_date: NaiveDate,
    #[serde(rename = "type", default)]
    pub fee_type: String,
    #[serde(default)]
    pub status: FeeStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installments: Vec<Installment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Fee {
    pub fn is_installment_plan(&self) -> bool {
        self.fee_type == INSTALLMENT_FEE_TYPE
    }
}

impl Entity for Fee {
    const NOT_FOUND: &'static str = "Honorário não encontrado";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: String,
    pub number: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: InstallmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
}

impl Entity for Installment {
    const NOT_FOUND: &'static str = "Parcela não encontrada";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub case_id: String,
    #[serde(default)]
    pub description: String,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Expense {
    const NOT_FOUND: &'static str = "Despesa não encontrada";

    fn id(&self) -> &str {
        &self.id
    }
}

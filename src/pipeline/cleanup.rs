//! Column derivations for the main tender table
//!
//! Runs only on the configured main source before filtering and extraction.
//! The rules assume a fixed schema: a missing column aborts the run.

use crate::error::PipelineError;

use super::loader::Table;
use super::value::Value;

/// Column names touched by [`clean_main_table`]
#[derive(Debug, Clone)]
pub struct CleanupColumns {
    pub cpv_code: String,
    pub cpv_division: String,
    pub framework_reference: String,
    pub framework_flag: String,
    pub sector: String,
    pub regional_section: String,
    pub contract_type: String,
}

impl Default for CleanupColumns {
    fn default() -> Self {
        Self {
            cpv_code: "cod_cpv".to_string(),
            cpv_division: "cpv_division".to_string(),
            framework_reference: "cig_accordo_quadro".to_string(),
            framework_flag: "accordo_quadro".to_string(),
            sector: "settore".to_string(),
            regional_section: "sezione_regionale".to_string(),
            contract_type: "oggetto_principale_contratto".to_string(),
        }
    }
}

/// Substrings removed from the sector label
const SECTOR_STRIP: &[(&str, &str)] = &[("SETTORI ", "")];

/// Applied in order; the two-space variant must go first
const REGION_STRIP: &[(&str, &str)] = &[
    ("SEZIONE REGIONALE  ", ""),
    ("SEZIONE REGIONALE ", ""),
    ("PROVINCIA AUTONOMA DI", "PA"),
];

/// Contract type labels and their single-letter codes
pub const CONTRACT_TYPE_CODES: &[(&str, &str)] = &[
    ("LAVORI", "W"),    // work
    ("SERVIZI", "S"),   // services
    ("FORNITURE", "U"), // supplies
];

/// Apply the main-table derivations in place
pub fn clean_main_table(table: &mut Table, columns: &CleanupColumns) -> Result<(), PipelineError> {
    let cpv = column_values(table, &columns.cpv_code)?;
    let cpv_division = cpv
        .iter()
        .map(|v| match v {
            Value::Null => Value::Null,
            other => Value::Str(other.to_string().chars().take(2).collect()),
        })
        .collect();
    table.set_column(&columns.cpv_division, cpv_division);

    let framework = column_values(table, &columns.framework_reference)?;
    let flags = framework
        .iter()
        .map(|v| Value::from(if v.is_null() { "0" } else { "1" }))
        .collect();
    table.set_column(&columns.framework_flag, flags);

    let sector = column_values(table, &columns.sector)?;
    table.set_column(&columns.sector, replace_all(&sector, SECTOR_STRIP));

    let region = column_values(table, &columns.regional_section)?;
    table.set_column(&columns.regional_section, replace_all(&region, REGION_STRIP));

    let contract = column_values(table, &columns.contract_type)?;
    let recoded = contract.iter().map(recode_contract_type).collect();
    table.set_column(&columns.contract_type, recoded);

    Ok(())
}

fn column_values(table: &Table, column: &str) -> Result<Vec<Value>, PipelineError> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| PipelineError::MissingColumn {
            table: table.name.clone(),
            column: column.to_string(),
        })?;
    Ok(table.rows.iter().map(|r| r[idx].clone()).collect())
}

fn replace_all(values: &[Value], replacements: &[(&str, &str)]) -> Vec<Value> {
    values
        .iter()
        .map(|v| match v {
            Value::Str(s) => {
                let mut out = s.clone();
                for (from, to) in replacements {
                    out = out.replace(from, to);
                }
                Value::Str(out)
            }
            other => other.clone(),
        })
        .collect()
}

/// Exact-match recoding; anything else passes through unchanged
pub fn recode_contract_type(value: &Value) -> Value {
    if let Value::Str(s) = value {
        if let Some((_, code)) = CONTRACT_TYPE_CODES.iter().find(|(label, _)| *label == s.as_str()) {
            return Value::from(*code);
        }
    }
    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recode_contract_type() {
        assert_eq!(recode_contract_type(&Value::from("LAVORI")), Value::from("W"));
        assert_eq!(recode_contract_type(&Value::from("SERVIZI")), Value::from("S"));
        assert_eq!(recode_contract_type(&Value::from("FORNITURE")), Value::from("U"));
        assert_eq!(recode_contract_type(&Value::from("MISTO")), Value::from("MISTO"));
        assert_eq!(recode_contract_type(&Value::Null), Value::Null);
    }

    #[test]
    fn test_region_prefixes_stripped_in_order() {
        let values = vec![
            Value::from("SEZIONE REGIONALE  LAZIO"),
            Value::from("SEZIONE REGIONALE VENETO"),
            Value::from("SEZIONE REGIONALE PROVINCIA AUTONOMA DI TRENTO"),
            Value::Null,
        ];
        let out = replace_all(&values, REGION_STRIP);
        assert_eq!(
            out,
            vec![
                Value::from("LAZIO"),
                Value::from("VENETO"),
                Value::from("PA TRENTO"),
                Value::Null,
            ]
        );
    }
}

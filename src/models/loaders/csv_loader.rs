use crate::models::work_item::WorkItem;
use anyhow::{Context, Result};
use std::path::Path;

/// 名称列（NAMING CONVENTION）
const NAME_COLUMN: usize = 2;
/// 描述列
const DESCRIPTION_COLUMN: usize = 7;

/// 按固定列布局逐行读取表格
///
/// 第一行为表头；空行跳过；缺少名称的行使用 `Item <行号>`。
pub fn load_csv_records(csv_path: &Path) -> Result<Vec<WorkItem>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("无法读取表格文件: {}", csv_path.display()))?;

    let mut items = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("无法解析第 {} 行", index + 2))?;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }

        let name = row
            .get(NAME_COLUMN)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Item {}", index + 1));
        let description = row
            .get(DESCRIPTION_COLUMN)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        items.push(WorkItem::from_record(name, description));
    }

    tracing::info!("表格中共读取 {} 条记录", items.len());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::work_item::ItemPayload;
    use std::io::Write;

    #[test]
    fn test_reads_fixed_columns_row_by_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Section,Task,NAMING CONVENTION,Freq,Asset,Loc,Owner,Description").unwrap();
        writeln!(file, "2,ACCU,2.16-ACCU-Semi-Annual,6M,A1,Roof,Ops,\"Check coils, fans\"").unwrap();
        writeln!(file, ",,,,,,,").unwrap();
        writeln!(file, "3,Boiler,,12M,B1,Basement,Ops,").unwrap();

        let items = load_csv_records(file.path()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "2.16-ACCU-Semi-Annual");
        assert_eq!(items[0].description(), Some("Check coils, fans"));
        assert_eq!(
            items[1].payload,
            ItemPayload::Record {
                name: "Item 3".to_string(),
                description: None
            }
        );
    }
}

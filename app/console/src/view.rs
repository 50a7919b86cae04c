use prettytable::{row, Cell, Row, Table};
use shared::proto::RecordView;

const NO_DATA: &str = "No data";

pub struct View {}

impl View {
    /// 列表表格；空列表只有一行 "No data"
    pub fn records(records: &[RecordView]) -> Table {
        let mut table = Table::new();

        table.set_titles(row!["Name", "Email", "Mobile", "Date of Birth"]);
        if records.is_empty() {
            table.add_row(Row::new(vec![Cell::new(NO_DATA)
                .with_hspan(4)
                .style_spec("c")]));
        }
        for record in records {
            table.add_row(row![
                record.name,
                record.email,
                record.mobile,
                record.formatted_date
            ]);
        }
        table
    }

    /// 选择菜单里的一行
    pub fn record_label(record: &RecordView) -> String {
        format!(
            "{} <{}> {} {}",
            record.name, record.email, record.mobile, record.formatted_date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::alice_view;

    #[test]
    fn test_empty_list_renders_no_data_row() {
        let rendered = View::records(&[]).to_string();
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("Date of Birth"));
        assert!(rendered.contains(NO_DATA));
    }

    #[test]
    fn test_rows_show_display_date() {
        let table = View::records(&[alice_view()]);
        assert_eq!(table.len(), 1);
        let rendered = table.to_string();
        assert!(rendered.contains("Alice"));
        assert!(rendered.contains("15/06/1990"));
        assert!(!rendered.contains("1990-06-15"));
        assert!(!rendered.contains(NO_DATA));
    }

    #[test]
    fn test_label_identifies_record() {
        assert_eq!(
            View::record_label(&alice_view()),
            "Alice <a@x.com> 9999999999 15/06/1990"
        );
    }
}

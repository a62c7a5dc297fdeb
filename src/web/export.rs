use rust_xlsxwriter::{Format, Workbook};

use crate::db::models::Request;

pub const CSV_CONTENT_TYPE: &str = "text/csv";
pub const CSV_FILENAME: &str = "export.csv";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLSX_FILENAME: &str = "requests.xlsx";

/// Raw table columns, in storage order.
pub const CSV_HEADER: [&str; 8] = [
    "ID", "SITEID", "SURNAME", "PHONE", "STATUS", "DATE", "TIME", "USER_ID",
];

/// Human-facing labels; id and submitter are left out of the spreadsheet.
pub const XLSX_HEADER: [&str; 6] = ["SITEID", "Фамилия", "Телефон", "Статус", "Дата", "Время"];

pub fn to_csv(rows: &[Request]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for r in rows {
        writer.write_record([
            r.id.to_string(),
            r.site_id.clone(),
            r.surname.clone(),
            r.phone.clone(),
            r.status.clone(),
            r.date.clone(),
            r.time.clone(),
            r.submitter_id.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV export: {}", e.error()))
}

pub fn to_xlsx(rows: &[Request]) -> anyhow::Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, label) in XLSX_HEADER.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *label, &header_format)?;
    }

    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        let cells = [&r.site_id, &r.surname, &r.phone, &r.status, &r.date, &r.time];
        for (col, value) in cells.into_iter().enumerate() {
            // Written as text so leading zeros in site ids survive.
            sheet.write_string(row, col as u16, value.as_str())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, site_id: &str, surname: &str) -> Request {
        Request {
            id,
            site_id: site_id.to_string(),
            surname: surname.to_string(),
            phone: "+77001234567".to_string(),
            status: "open".to_string(),
            date: "2024-05-01".to_string(),
            time: "09:15:00".to_string(),
            submitter_id: 777,
        }
    }

    #[test]
    fn csv_has_header_and_machine_columns() {
        let bytes = to_csv(&[row(1, "01234", "Ivanov"), row(2, "55555", "Doe, John")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "ID,SITEID,SURNAME,PHONE,STATUS,DATE,TIME,USER_ID");
        assert_eq!(lines[1], "1,01234,Ivanov,+77001234567,open,2024-05-01,09:15:00,777");
        assert_eq!(lines[2], "2,55555,\"Doe, John\",+77001234567,open,2024-05-01,09:15:00,777");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_of_empty_table_is_just_the_header() {
        let text = String::from_utf8(to_csv(&[]).unwrap()).unwrap();
        assert_eq!(text.trim_end(), CSV_HEADER.join(","));
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = to_xlsx(&[row(1, "01234", "Ivanov")]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}

//! Builders for raw emails, workbooks and trigger events.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zip::write::SimpleFileOptions;

/// Builds a multipart MIME message with base64 attachments.
pub struct EmailBuilder {
    from: Option<String>,
    to: Option<String>,
    date: Option<String>,
    subject: String,
    attachments: Vec<(String, String, Vec<u8>)>,
}

impl EmailBuilder {
    pub fn new() -> Self {
        Self {
            from: Some("Reports <reports@vendor.com>".to_string()),
            to: Some("intake@corp.com".to_string()),
            date: Some("Mon, 11 Jan 2021 07:29:38 +0000".to_string()),
            subject: "Monthly numbers".to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn from(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    pub fn without_from(mut self) -> Self {
        self.from = None;
        self
    }

    pub fn without_date(mut self) -> Self {
        self.date = None;
        self
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    pub fn attach(mut self, filename: &str, content_type: &str, payload: &[u8]) -> Self {
        self.attachments
            .push((filename.to_string(), content_type.to_string(), payload.to_vec()));
        self
    }

    pub fn csv(self, filename: &str, body: &str) -> Self {
        self.attach(filename, "text/csv", body.as_bytes())
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = String::new();
        if let Some(from) = &self.from {
            out.push_str(&format!("From: {}\r\n", from));
        }
        if let Some(to) = &self.to {
            out.push_str(&format!("To: {}\r\n", to));
        }
        if let Some(date) = &self.date {
            out.push_str(&format!("Date: {}\r\n", date));
        }
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str("Content-Type: multipart/mixed; boundary=\"=_boundary\"\r\n\r\n");

        out.push_str("--=_boundary\r\nContent-Type: text/plain\r\n\r\nPlease find attached.\r\n");
        for (filename, content_type, payload) in &self.attachments {
            out.push_str("--=_boundary\r\n");
            out.push_str(&format!(
                "Content-Type: {}; name=\"{}\"\r\n",
                content_type, filename
            ));
            out.push_str(&format!(
                "Content-Disposition: attachment; filename=\"{}\"\r\n",
                filename
            ));
            out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
            let encoded = STANDARD.encode(payload);
            for line in encoded.as_bytes().chunks(76) {
                out.push_str(&String::from_utf8_lossy(line));
                out.push_str("\r\n");
            }
        }
        out.push_str("--=_boundary--\r\n");
        out.into_bytes()
    }
}

/// Single-sheet xlsx workbook.
///
/// Cells prefixed with `#` are numbers, everything else is an inline string.
pub fn xlsx_workbook(rows: &[&[&str]]) -> Vec<u8> {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", (b'A' + c as u8) as char, r + 1);
            match value.strip_prefix('#') {
                Some(number) => {
                    sheet.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, number))
                }
                None => sheet.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    cell_ref, value
                )),
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        zip.start_file(name, SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        zip.write_all(body.as_bytes())
            .expect("Failed to write zip entry");
    }
    zip.finish().expect("Failed to finish workbook").into_inner()
}

/// Storage-change event naming `keys` in `bucket`, keys given URL-encoded.
pub fn storage_event(bucket: &str, keys: &[&str]) -> String {
    let records: Vec<serde_json::Value> = keys
        .iter()
        .map(|key| {
            serde_json::json!({
                "eventSource": "aws:s3",
                "s3": { "bucket": { "name": bucket }, "object": { "key": key } }
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}

/// Inbound-mail event with one record per sender.
pub fn inbound_event(senders: &[&str]) -> String {
    let records: Vec<serde_json::Value> = senders
        .iter()
        .map(|sender| {
            serde_json::json!({
                "eventSource": "aws:ses",
                "ses": { "mail": { "source": sender, "messageId": "m-1" } }
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}

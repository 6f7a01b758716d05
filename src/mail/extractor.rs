use mailparse::MailHeaderMap;

use crate::domain::email::{MessageRecord, RawMessage};
use crate::error::ExtractionError;
use crate::mail::decoders::decode_subject;

pub const NO_SUBJECT: &str = "(no subject)";

/// Pulls the `Date` and decoded `Subject` headers out of one raw message.
///
/// A missing `Date` yields an empty date string, which aggregation drops
/// like any other unreadable date. Subjects in a charset that cannot be decoded are kept as best-effort
/// text rather than rejected.
pub fn extract_record(raw: &RawMessage) -> Result<MessageRecord, ExtractionError> {
    let (headers, _body_offset) =
        mailparse::parse_headers(&raw.bytes).map_err(|e| ExtractionError::Parse {
            id: raw.id,
            reason: e.to_string(),
        })?;

    let date = headers
        .get_first_value("Date")
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    let subject = headers
        .get_first_header("Subject")
        .map(|h| decode_subject(h.get_value_raw()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NO_SUBJECT.to_string());

    Ok(MessageRecord {
        id: raw.id,
        date,
        subject,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose};

    fn raw(id: u32, text: &str) -> RawMessage {
        RawMessage {
            id,
            bytes: text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn plain_headers() {
        let msg = raw(
            7,
            "Date: Mon, 1 Jan 2024 10:00:00 +0000\r\nSubject: TESTE 1\r\n\r\nbody\r\n",
        );
        let rec = extract_record(&msg).unwrap();
        assert_eq!(rec.id, 7);
        assert_eq!(rec.date, "Mon, 1 Jan 2024 10:00:00 +0000");
        assert_eq!(rec.subject, "TESTE 1");
    }

    #[test]
    fn base64_utf8_subject_round_trips() {
        let text = "Chamado nº 42 — falha no servidor";
        let encoded = general_purpose::STANDARD.encode(text.as_bytes());
        let msg = raw(
            1,
            &format!(
                "Date: Tue, 2 Jan 2024 08:00:00 +0000\r\nSubject: =?UTF-8?B?{encoded}?=\r\n\r\n"
            ),
        );
        assert_eq!(extract_record(&msg).unwrap().subject, text);
    }

    #[test]
    fn folded_subject_is_unfolded() {
        let msg = raw(
            1,
            "Subject: first part\r\n second part\r\nDate: Tue, 2 Jan 2024 08:00:00 +0000\r\n\r\n",
        );
        assert_eq!(extract_record(&msg).unwrap().subject, "first part second part");
    }

    #[test]
    fn missing_subject_gets_placeholder() {
        let msg = raw(3, "Date: Tue, 2 Jan 2024 08:00:00 +0000\r\n\r\n");
        assert_eq!(extract_record(&msg).unwrap().subject, NO_SUBJECT);
    }

    #[test]
    fn missing_date_becomes_an_undated_record() {
        let msg = raw(9, "Subject: hello\r\n\r\n");
        let rec = extract_record(&msg).unwrap();
        assert_eq!(rec.id, 9);
        assert_eq!(rec.date, "");
        assert_eq!(rec.subject, "hello");
    }

    #[test]
    fn unparseable_date_text_is_kept_verbatim() {
        let msg = raw(2, "Date: not-a-date\r\nSubject: x\r\n\r\n");
        assert_eq!(extract_record(&msg).unwrap().date, "not-a-date");
    }
}

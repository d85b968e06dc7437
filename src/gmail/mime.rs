use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MimeMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub body: String,
    pub attachments: Vec<MimeAttachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MimeAttachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

pub fn build_raw_message(message: &MimeMessage) -> String {
    let mut headers = build_base_headers(message);

    let payload = if message.attachments.is_empty() {
        headers.push("Content-Type: text/plain; charset=utf-8".to_string());
        format!("{}\r\n\r\n{}", headers.join("\r\n"), message.body)
    } else {
        let boundary = random_boundary();
        headers.push(format!(
            "Content-Type: multipart/mixed; boundary=\"{boundary}\""
        ));
        format!(
            "{}\r\n\r\n{}",
            headers.join("\r\n"),
            multipart_body(message, &boundary)
        )
    };

    URL_SAFE_NO_PAD.encode(payload.as_bytes())
}

/// Decodes a base64url RFC 822 payload into its headers, text body and attachments.
pub fn parse_raw_message(raw: &str) -> Option<MimeMessage> {
    let bytes = decode_payload(raw)?;
    let text = String::from_utf8_lossy(&bytes);
    let (headers, body) = split_part(&text);

    let mut message = MimeMessage {
        from: header_value(&headers, "From").unwrap_or_default(),
        to: header_value(&headers, "To").unwrap_or_default(),
        subject: header_value(&headers, "Subject").unwrap_or_default(),
        date: header_value(&headers, "Date").unwrap_or_default(),
        ..MimeMessage::default()
    };

    let content_type = header_value(&headers, "Content-Type").unwrap_or_default();
    match boundary_param(&content_type) {
        Some(boundary) => read_multipart(&mut message, body, &boundary),
        None => message.body = body.trim_end().to_string(),
    }

    Some(message)
}

pub fn guess_mime_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn decode_payload(raw: &str) -> Option<Vec<u8>> {
    let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    URL_SAFE_NO_PAD
        .decode(compact.trim_end_matches('='))
        .or_else(|_| STANDARD.decode(&compact))
        .ok()
}

fn build_base_headers(message: &MimeMessage) -> Vec<String> {
    let mut headers = Vec::new();
    if !message.from.is_empty() {
        headers.push(format!("From: {}", message.from));
    }
    headers.push(format!("To: {}", message.to));
    headers.push(format!("Subject: {}", message.subject));
    if !message.date.is_empty() {
        headers.push(format!("Date: {}", message.date));
    }
    headers
}

fn multipart_body(message: &MimeMessage, boundary: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
    out.push_str(&message.body);
    out.push_str("\r\n");

    for attachment in &message.attachments {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!(
            "Content-Type: {}; name=\"{}\"\r\n",
            attachment.mime_type,
            escape_header_value(&attachment.filename)
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
            escape_header_value(&attachment.filename)
        ));

        let encoded = STANDARD.encode(&attachment.data);
        out.push_str(&fold_base64_lines(&encoded));
        out.push_str("\r\n");
    }

    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

fn read_multipart(message: &mut MimeMessage, body: &str, boundary: &str) {
    let delimiter = format!("--{boundary}");
    for part in body.split(delimiter.as_str()).skip(1) {
        if part.starts_with("--") {
            break;
        }

        let (headers, content) = split_part(part.trim_start_matches(['\r', '\n']));
        let disposition = header_value(&headers, "Content-Disposition").unwrap_or_default();
        let content_type = header_value(&headers, "Content-Type").unwrap_or_default();

        if disposition.to_ascii_lowercase().contains("attachment") {
            let filename = quoted_param(&disposition, "filename").unwrap_or_default();
            let encoding = header_value(&headers, "Content-Transfer-Encoding").unwrap_or_default();
            let data = if encoding.eq_ignore_ascii_case("base64") {
                let compact: String = content.chars().filter(|ch| !ch.is_whitespace()).collect();
                STANDARD.decode(compact).unwrap_or_default()
            } else {
                content.trim_end().as_bytes().to_vec()
            };
            let mime_type = match content_type.split(';').next().map(str::trim) {
                Some(essence) if !essence.is_empty() => essence.to_string(),
                _ => guess_mime_type(&filename),
            };
            message.attachments.push(MimeAttachment {
                filename,
                mime_type,
                data,
            });
        } else if message.body.is_empty() {
            message.body = content.trim_end().to_string();
        }
    }
}

fn split_part(text: &str) -> (Vec<(String, String)>, &str) {
    let (head, body) = match text.find("\r\n\r\n") {
        Some(index) => (&text[..index], &text[index + 4..]),
        None => match text.find("\n\n") {
            Some(index) => (&text[..index], &text[index + 2..]),
            None => (text, ""),
        },
    };

    let mut headers: Vec<(String, String)> = Vec::new();
    for line in head.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    (headers, body)
}

fn header_value(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.clone())
}

fn boundary_param(content_type: &str) -> Option<String> {
    if !content_type.to_ascii_lowercase().starts_with("multipart/") {
        return None;
    }
    quoted_param(content_type, "boundary")
}

fn quoted_param(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

fn fold_base64_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 76 + 8);
    let mut start = 0;
    while start < input.len() {
        let end = (start + 76).min(input.len());
        out.push_str(&input[start..end]);
        out.push_str("\r\n");
        start = end;
    }
    out
}

fn random_boundary() -> String {
    let mut bytes = [0_u8; 12];
    rand::thread_rng().fill(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    format!("apisim-{token}")
}

fn escape_header_value(value: &str) -> String {
    value.replace('"', "")
}

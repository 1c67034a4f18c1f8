//! Recipient list loading.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use campaign_domain::{Recipient, RecipientQueue};

/// Contacts used when no recipient file is given.
const DEMO_CONTACTS: [(&str, &str); 10] = [
    ("+5511987654321", "João Silva"),
    ("+5511987654322", "Maria Oliveira"),
    ("+5511987654323", "Carlos Santos"),
    ("+5511987654324", "Ana Souza"),
    ("+5511987654325", "Paulo Lima"),
    ("+5511987654326", "Lucia Pereira"),
    ("+5511987654327", "Roberto Alves"),
    ("+5511987654328", "Julia Costa"),
    ("+5511987654329", "Felipe Martins"),
    ("+5511987654330", "Patricia Ferreira"),
];

pub fn demo_recipients() -> RecipientQueue {
    DEMO_CONTACTS
        .iter()
        .filter_map(|(address, name)| Recipient::with_name(*address, *name).ok())
        .collect()
}

/// Parses `address[,display name]` lines. Blank lines, `#` comments and a
/// leading `phone,name` style header are skipped.
pub fn parse_recipients(content: &str) -> Result<RecipientQueue> {
    let mut recipients = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (address, name) = match line.split_once(',') {
            Some((address, name)) => (address.trim(), name.trim()),
            None => (line, ""),
        };

        if recipients.is_empty() && is_header(address) {
            debug!("跳过表头: {}", line);
            continue;
        }

        let recipient = Recipient::with_name(address, name)
            .with_context(|| format!("第 {} 行收件人无效", line_no + 1))?;
        recipients.push(recipient);
    }

    Ok(RecipientQueue::new(recipients))
}

pub async fn load_recipients<P: AsRef<Path>>(path: P) -> Result<RecipientQueue> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取收件人文件失败: {}", path.display()))?;
    let queue = parse_recipients(&content)?;
    info!("从 {} 加载了 {} 个收件人", path.display(), queue.len());
    Ok(queue)
}

fn is_header(address: &str) -> bool {
    matches!(
        address.to_lowercase().as_str(),
        "phone" | "telefone" | "number" | "numero" | "número" | "address"
    )
}

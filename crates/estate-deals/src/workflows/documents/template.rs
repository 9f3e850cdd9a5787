use super::domain::DocumentKind;

/// Minimal fill-in template for a document kind. Same inputs always give the same bytes.
pub fn generate_template(kind: DocumentKind, title: &str) -> Vec<u8> {
    let mut body = String::new();
    body.push_str(&format!("{}\n", title.trim()));
    body.push_str(&format!("Тип документа: {}\n", kind.label()));
    body.push_str(&"=".repeat(40));
    body.push('\n');

    for field in fields(kind) {
        body.push_str(&format!("{field}: ____________________\n"));
    }

    body.push('\n');
    body.push_str("Дата: ____.____.________\n");
    body.push_str("Подпись: ____________________\n");
    body.into_bytes()
}

fn fields(kind: DocumentKind) -> &'static [&'static str] {
    match kind {
        DocumentKind::Passport => &["ФИО", "Серия и номер", "Кем выдан", "Дата выдачи"],
        DocumentKind::Income => &["ФИО", "Место работы", "Должность", "Среднемесячный доход"],
        DocumentKind::Contract => &["Продавец", "Покупатель", "Объект", "Цена"],
        DocumentKind::Mortgage => &["Банк", "Сумма кредита", "Срок", "Ставка"],
        DocumentKind::Insurance => &["Страховщик", "Номер полиса", "Срок действия"],
        DocumentKind::Other => &["Описание"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_deterministic_and_titled() {
        let first = generate_template(DocumentKind::Contract, "Предварительный договор");
        let second = generate_template(DocumentKind::Contract, "Предварительный договор");
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        assert!(text.starts_with("Предварительный договор\n"));
        assert!(text.contains("Тип документа: Договор"));
        assert!(text.contains("Покупатель: "));
    }

    #[test]
    fn kinds_produce_distinct_templates() {
        let mut templates: Vec<Vec<u8>> = DocumentKind::ordered()
            .into_iter()
            .map(|kind| generate_template(kind, "Документ"))
            .collect();
        templates.sort();
        templates.dedup();
        assert_eq!(templates.len(), DocumentKind::ordered().len());
    }
}

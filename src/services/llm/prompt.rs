use crate::kernel::report::{Field, Report};

/// Builds the system instruction from the current report state.
///
/// Every field is listed with its value or the "not specified" placeholder so
/// the model can ask about exactly one missing field at a time.
pub fn instruction(report: &Report) -> String {
    let mut fields = String::new();
    for field in Field::ALL {
        let heading = match field {
            Field::Location => "Место",
            other => other.heading(),
        };
        fields.push_str(&format!("- {}: {}\n", heading, report.display(field)));
    }

    format!(
        "Ты - помощник аварийного комиссара. Помогаешь оформить заявку после ДТП.\n\
         \n\
         Твоя задача:\n\
         1. Собрать информацию: место ДТП, участники, повреждения, пострадавшие, контакт\n\
         2. Быть вежливым и кратким\n\
         3. Задавать по одному вопросу за раз\n\
         \n\
         Текущие данные заявки:\n\
         {}\n\
         Если поле не заполнено, спроси о нём. Отвечай кратко на русском языке.",
        fields
    )
}

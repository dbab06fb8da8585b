//! Blade view assembly.
//!
//! Views carry their own `{{ }}` delimiters, so they are built with plain
//! string formatting instead of the template registry. The form markup
//! per input type and the DataTable column list follow the admin UI's
//! conventions: translation keys under `{Studly}/{Studly}.…`, ids
//! prefixed with the component's `$action`.

use crate::paths::ModuleNames;
use crate::schema::{FieldSpec, FieldType, ValidatedSchema};

/// The module's listing page: DataTable column definitions plus the
/// shared form component for add/edit modals.
pub fn index_view(schema: &ValidatedSchema, names: &ModuleNames) -> String {
    let studly = &names.studly;
    let kebab = &names.kebab;

    let mut columns = Vec::new();
    for field in &schema.fields {
        if !field.show_in_table {
            continue;
        }
        let orderable = if field.sortable { "" } else { ", 'orderable' => false" };
        columns.push(format!(
            "        ['data' => '{0}', 'title' => __('{studly}/{studly}.table_headers.{0}'){orderable}],",
            field.name
        ));
    }
    columns.push(format!(
        "        ['data' => 'created_at', 'title' => __('{studly}/{studly}.table_headers.created_at')],"
    ));
    columns.push(format!(
        "        ['data' => 'action', 'title' => __('{studly}/{studly}.table_headers.actions'), 'orderable' => false, 'responsivePriority' => 1],"
    ));
    let columns = columns.join("\n");

    format!(
        r#"@extends('backend.layouts.app')

@section('title', __('{studly}/{studly}.page_card_title'))

@section('content')
@php
    $columns = [
{columns}
    ];
@endphp
<x-backend.datatable
    id="{kebab}-table"
    :columns="$columns"
    :url="route('all-{kebab}-records')"
    :archived-url="route('archived-{kebab}-records')"
    :order="[1, 'desc']"
/>
<x-{kebab}-form action="add" />
<x-{kebab}-form action="edit" />
@endsection
"#
    )
}

/// The shared add/edit form body. One labelled input block per field.
pub fn form_view(schema: &ValidatedSchema, names: &ModuleNames) -> String {
    let mut blocks = Vec::new();
    for field in &schema.fields {
        blocks.push(form_field(field, &names.studly));
    }
    blocks.join("\n")
}

fn form_field(field: &FieldSpec, studly: &str) -> String {
    let mut html = String::from("<div class=\"col-lg-6 col-sm-12 mb-3\">\n");
    html.push_str(&label_markup(field, studly));
    let input = match field.field_type {
        FieldType::Select | FieldType::Multiselect => select_markup(field, studly),
        FieldType::Radio => radio_markup(field),
        FieldType::Checkbox => checkbox_markup(field),
        FieldType::Textarea => textarea_markup(field, studly),
        FieldType::Date => picker_markup(field, "date", "flatpickr-date-input"),
        FieldType::Time => picker_markup(field, "time", "flatpickr-time-input"),
        FieldType::Datetime => picker_markup(field, "datetime", "flatpickr-datetime-input"),
        _ => default_markup(field, studly),
    };
    html.push_str(&input);
    html.push_str("</div>\n");
    html
}

fn label_markup(field: &FieldSpec, studly: &str) -> String {
    let required = if field.is_required() {
        " <span class=\"text-danger\">*</span>"
    } else {
        ""
    };
    format!(
        "    <label for=\"{{{{ $action }}}}_{0}\" class=\"form-label\">{{{{ __(\"{studly}/{studly}.fields.{0}.label\") }}}}{required}</label>\n",
        field.name
    )
}

fn input_attributes(field: &FieldSpec) -> String {
    let mut attributes = Vec::new();
    if field.is_required() {
        attributes.push("required".to_string());
    }
    for rule in &field.frontend_validation {
        match rule.as_str() {
            "maxLength" => {
                let max = field
                    .frontend_params
                    .get("maxLength")
                    .map(String::as_str)
                    .unwrap_or("");
                attributes.push(format!("maxlength=\"{max}\""));
            }
            "pattern" => {
                let pattern = field
                    .frontend_params
                    .get("pattern")
                    .map(String::as_str)
                    .unwrap_or("");
                attributes.push(format!("pattern=\"{pattern}\""));
            }
            _ => {}
        }
    }
    if attributes.is_empty() {
        String::new()
    } else {
        format!(" {}", attributes.join(" "))
    }
}

fn default_markup(field: &FieldSpec, studly: &str) -> String {
    format!(
        "    <input type=\"{ty}\" class=\"form-control\" id=\"{{{{ $action }}}}_{name}\" name=\"{name}\" placeholder=\"{{{{ __(\"{studly}/{studly}.fields.{name}.placeholder\") }}}}\"{attrs}>\n",
        ty = field.field_type,
        name = field.name,
        attrs = input_attributes(field),
    )
}

fn textarea_markup(field: &FieldSpec, studly: &str) -> String {
    format!(
        "    <textarea class=\"form-control\" id=\"{{{{ $action }}}}_{name}\" name=\"{name}\" placeholder=\"{{{{ __(\"{studly}/{studly}.fields.{name}.placeholder\") }}}}\"{attrs}></textarea>\n",
        name = field.name,
        attrs = input_attributes(field),
    )
}

fn picker_markup(field: &FieldSpec, input_type: &str, class: &str) -> String {
    format!(
        "    <input type=\"{input_type}\" class=\"form-control {class}\" id=\"{{{{ $action }}}}_{name}\" name=\"{name}\"{attrs}>\n",
        name = field.name,
        attrs = input_attributes(field),
    )
}

fn select_markup(field: &FieldSpec, studly: &str) -> String {
    let multiple = field.field_type == FieldType::Multiselect;
    let mut html = format!(
        "    <select class=\"form-control select2-field\"{multi} id=\"{{{{ $action }}}}_{name}\" name=\"{name}{brackets}\" data-placeholder=\"{{{{ __(\"{studly}/{studly}.fields.{name}.placeholder\") }}}}\"{attrs}>\n",
        multi = if multiple { " multiple" } else { "" },
        name = field.name,
        brackets = if multiple { "[]" } else { "" },
        attrs = input_attributes(field),
    );
    for option in &field.options {
        html.push_str(&format!(
            "        <option value=\"{}\">{}</option>\n",
            option.value, option.label
        ));
    }
    html.push_str("    </select>\n");
    html
}

fn radio_markup(field: &FieldSpec) -> String {
    let mut html = String::from("    <div class=\"d-flex flex-wrap gap-3\">\n");
    for option in &field.options {
        let id = format!(
            "{{{{ $action }}}}_{}_{}",
            field.name,
            option.value.to_lowercase().replace([' ', '_'], "-")
        );
        html.push_str("        <div class=\"form-check form-check-inline\">\n");
        html.push_str(&format!(
            "            <input class=\"form-check-input\" type=\"radio\" name=\"{}\" id=\"{id}\" value=\"{}\"{}>\n",
            field.name,
            option.value,
            input_attributes(field),
        ));
        html.push_str(&format!(
            "            <label class=\"form-check-label\" for=\"{id}\">{}</label>\n",
            option.label
        ));
        html.push_str("        </div>\n");
    }
    html.push_str("    </div>\n");
    html
}

fn checkbox_markup(field: &FieldSpec) -> String {
    let mut html = String::from("    <div class=\"form-check\">\n");
    html.push_str(&format!(
        "        <input type=\"checkbox\" class=\"form-check-input\" id=\"{{{{ $action }}}}_{name}\" name=\"{name}\" value=\"1\"{attrs}>\n",
        name = field.name,
        attrs = input_attributes(field),
    ));
    html.push_str("    </div>\n");
    html
}

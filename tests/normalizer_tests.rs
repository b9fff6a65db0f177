use formsight::document::record::{FieldType, FieldValue};
use formsight::text::normalizer::{
    check_empty, clean_alphabet, clean_free_text, clean_identity, clean_number,
    clean_region_text, clean_single_character, normalize, separate_entries, strip_foreign,
    CharKind, EntryKind, NumberKind, NONE,
};
use formsight::text::PresentorBlock;

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn test_confusable_digits_are_corrected() {
    assert_eq!(clean_number("I0I", NumberKind::Plain), "101");
    assert_eq!(clean_number("5O,OOO", NumberKind::Plain), "50000");
}

#[test]
fn test_clean_number_is_idempotent() {
    for input in ["I0I", "12 345", "abc", "", "7.25", "None", "S|O"] {
        let once = clean_number(input, NumberKind::Plain);
        assert_eq!(clean_number(&once, NumberKind::Plain), once, "input {input:?}");
    }
}

#[test]
fn test_number_without_digits_is_none() {
    assert_eq!(clean_number("---", NumberKind::Plain), NONE);
    assert_eq!(clean_number("", NumberKind::Plain), NONE);
}

#[test]
fn test_contact_number_strips_country_code() {
    assert_eq!(clean_number("+852 2345 6789", NumberKind::Contact), "23456789");
    assert_eq!(clean_number("0852 98765432", NumberKind::Contact), "98765432");
    assert_eq!(clean_number("9876 54321", NumberKind::Contact), "98765432");
}

#[test]
fn test_short_contact_number_is_none() {
    assert_eq!(clean_number("2345 678", NumberKind::Contact), NONE);
    assert_eq!(clean_number("852 1234", NumberKind::Contact), NONE);
}

// ============================================================================
// Letters and names
// ============================================================================

#[test]
fn test_short_tokens_are_noise() {
    assert_eq!(clean_alphabet("ab cd e"), NONE);
    assert_eq!(normalize(FieldType::Name, "ab | cd"), NONE);
    assert_eq!(check_empty("a bc"), NONE);
}

#[test]
fn test_clean_alphabet_keeps_letters() {
    assert_eq!(clean_alphabet("CHAN Tai-man 123"), "CHAN Taiman");
    assert_eq!(normalize(FieldType::Name, "ACME TRADING LIMITED\n"), "ACME TRADING LIMITED");
}

#[test]
fn test_strip_foreign_removes_other_scripts() {
    assert_eq!(strip_foreign("Flat A, 1/F 雅苑"), "Flat A, 1F ");
}

#[test]
fn test_address_newlines_become_spaces() {
    assert_eq!(
        normalize(FieldType::Address, "Flat A, 1/F\n雅苑 Tower 2"),
        "Flat A, 1F  Tower 2"
    );
}

#[test]
fn test_single_character() {
    assert_eq!(clean_single_character("Q.", CharKind::Letter), "Q");
    assert_eq!(clean_single_character("b", CharKind::Letter), "");
    assert_eq!(clean_single_character("O", CharKind::Digit), "0");
    assert_eq!(clean_single_character("42", CharKind::Digit), "4");
}

// ============================================================================
// Identity numbers
// ============================================================================

#[test]
fn test_identity_example() {
    assert_eq!(clean_identity("A123456(7)"), "A123456(7)");
    assert_eq!(clean_identity("A1234567"), "A123456(7)");
    assert_eq!(clean_identity("Z 6 8 3 3 9 0 ( A )"), "Z683390(A)");
    assert_eq!(normalize(FieldType::Identity, "A123456(7)"), "A123456(7)");
}

#[test]
fn test_short_identity_is_none() {
    assert_eq!(clean_identity("A12"), NONE);
    assert_eq!(clean_identity(NONE), NONE);
}

// ============================================================================
// Free text and regions
// ============================================================================

#[test]
fn test_nil_marker_is_none() {
    assert_eq!(clean_free_text("(Nil)"), NONE);
    assert_eq!(normalize(FieldType::Email, " (Nil) "), NONE);
    assert_eq!(normalize(FieldType::Email, "info@acme.com.hk"), "info@acme.com.hk");
}

#[test]
fn test_region_text() {
    assert_eq!(clean_region_text("  N/A "), NONE);
    assert_eq!(clean_region_text("\n"), NONE);
    assert_eq!(clean_region_text(" text \n"), "text");
}

#[test]
fn test_none_input_stays_none() {
    for field_type in [
        FieldType::Name,
        FieldType::Address,
        FieldType::Phone,
        FieldType::Number,
        FieldType::Identity,
        FieldType::Email,
    ] {
        assert_eq!(normalize(field_type, NONE), NONE, "{field_type:?}");
    }
}

// ============================================================================
// Table entries
// ============================================================================

#[test]
fn test_separate_numeric_entries() {
    assert_eq!(
        separate_entries("1,000  2,500\n\n300", 2, EntryKind::Numbers),
        "1000;2500;300"
    );
}

#[test]
fn test_separate_name_entries_with_nil() {
    assert_eq!(
        separate_entries("CHAN TAI MAN  Nil  LEE SIU", 2, EntryKind::Letters),
        "CHAN TAI MAN;None;LEE SIU"
    );
}

#[test]
fn test_separate_raw_entries_keep_text() {
    assert_eq!(
        separate_entries("1 Main St   2 Side Rd", 3, EntryKind::Raw),
        "1 Main St;2 Side Rd"
    );
    assert_eq!(separate_entries("   ", 2, EntryKind::Raw), NONE);
}

// ============================================================================
// Presentor block
// ============================================================================

#[test]
fn test_presentor_example() {
    let text = concat!(
        "Name: John Smith\n",
        "Address: 1 Main St\n",
        "Tel: 12345678\n",
        "Fax: 23456789\n",
        "Email: a@b.com"
    );

    let block = PresentorBlock::parse(text).cleaned();

    assert_eq!(block.name, "John Smith");
    assert_eq!(block.address, "1 Main St");
    assert_eq!(block.telephone, "12345678");
    assert_eq!(block.fax, "23456789");
    assert_eq!(block.email, "a@b.com");
}

#[test]
fn test_presentor_without_email() {
    let block = PresentorBlock::parse("Name: John Smith\nAddress: 1 Main St\n").cleaned();

    assert_eq!(block.name, "John Smith");
    assert_eq!(block.telephone, NONE);
    assert_eq!(block.email, NONE);
}

#[test]
fn test_field_value_keeps_raw_text() {
    let value = FieldValue::from_raw(FieldType::Phone, "Tel: 2345 6789");
    assert_eq!(value.raw_text, "Tel: 2345 6789");
    assert!(value.is_resolved());

    let value = FieldValue::from_raw(FieldType::Name, "x y");
    assert_eq!(value.cleaned_text, NONE);
    assert!(!value.is_resolved());
}

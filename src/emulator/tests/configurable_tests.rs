use super::*;
use proptest::prelude::*;

fn range_schema() -> ConfigSchema {
    ConfigSchema::builder("basic_range")
        .option(ConfigurableOption::int("range", "wireless range (pixels)", 275))
        .option(ConfigurableOption::int("bandwidth", "bandwidth (bps)", 54_000_000))
        .option(ConfigurableOption::int("jitter", "transmission jitter (usec)", 0))
        .option(ConfigurableOption::boolean("enabled", "enabled", true))
        .option(ConfigurableOption::float("error", "loss (%)", 0.5))
        .group("Range", 1, 3)
        .group("Extras", 4, 5)
        .build()
}

#[test]
fn test_build_groups_uses_defaults_when_unset() {
    let schema = range_schema();
    let groups = build_groups(&BTreeMap::new(), &schema);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "Range");
    assert_eq!(groups[0].options.len(), 3);
    assert_eq!(groups[0].options[0].value, "275");
    assert_eq!(groups[0].options[1].value, "54000000");
    assert_eq!(groups[1].options[0].value, "1");
    assert_eq!(groups[1].options[0].choices, vec!["On", "Off"]);
    assert_eq!(groups[1].options[1].value, "0.5");
    assert_eq!(groups[1].options[1].data_type, ConfigDataType::Float);
}

#[test]
fn test_build_groups_prefers_current_values() {
    let schema = range_schema();
    let mut values = BTreeMap::new();
    values.insert("range".to_string(), "500".to_string());

    let groups = build_groups(&values, &schema);
    assert_eq!(groups[0].options[0].id, "range");
    assert_eq!(groups[0].options[0].label, "wireless range (pixels)");
    assert_eq!(groups[0].options[0].value, "500");
    assert_eq!(groups[0].options[0].data_type.code(), 7);
}

#[test]
fn test_malformed_groups_truncate_silently() {
    let schema = ConfigSchema::builder("broken")
        .option(ConfigurableOption::string("a", "A", ""))
        .option(ConfigurableOption::string("b", "B", ""))
        .group("overflow", 2, 9)
        .group("inverted", 2, 1)
        .group("beyond", 5, 6)
        .build();

    let groups = build_groups(&BTreeMap::new(), &schema);
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].options.len(), 1);
    assert_eq!(groups[0].options[0].id, "b");
    assert!(groups[1].options.is_empty());
    assert!(groups[2].options.is_empty());
}

#[test]
fn test_validate_rejects_mistyped_declared_values() {
    let schema = range_schema();
    let mut values = BTreeMap::new();
    values.insert("range".to_string(), "far".to_string());

    let err = schema.validate(&values).unwrap_err();
    assert_eq!(err.key, "range");
    assert_eq!(err.expected, ConfigDataType::Int32);
    assert!(err.to_string().contains("far"));
}

#[test]
fn test_apply_keeps_unknown_keys_and_rejects_atomically() {
    let schema = range_schema();
    let mut base = schema.defaults();

    let mut good = BTreeMap::new();
    good.insert("enabled".to_string(), "off".to_string());
    good.insert("custom".to_string(), "anything".to_string());
    schema.apply(&mut base, good).unwrap();
    assert_eq!(base["enabled"], "off");
    assert_eq!(base["custom"], "anything");

    let mut bad = BTreeMap::new();
    bad.insert("jitter".to_string(), "5".to_string());
    bad.insert("error".to_string(), "lots".to_string());
    assert!(schema.apply(&mut base, bad).is_err());
    assert_eq!(base["jitter"], "0");
}

#[test]
fn test_bool_parsing_variants() {
    let value = ConfigValue::Bool(false);
    assert_eq!(value.parse_like("TRUE"), Some(ConfigValue::Bool(true)));
    assert_eq!(value.parse_like("0"), Some(ConfigValue::Bool(false)));
    assert_eq!(value.parse_like("maybe"), None);
}

fn partitioned_schema(sizes: &[usize]) -> ConfigSchema {
    let mut builder = ConfigSchema::builder("generated");
    let mut next = 1;
    for (group_index, size) in sizes.iter().enumerate() {
        for option_index in 0..*size {
            let id = format!("g{}o{}", group_index, option_index);
            builder = builder.option(ConfigurableOption::string(&id, &id, "x"));
        }
        builder = builder.group(&format!("group{}", group_index), next, next + size - 1);
        next += size;
    }
    builder.build()
}

proptest! {
    #[test]
    fn prop_partitioned_groups_cover_every_option(sizes in proptest::collection::vec(1usize..6, 1..8)) {
        let schema = partitioned_schema(&sizes);
        let groups = build_groups(&BTreeMap::new(), &schema);

        let total: usize = groups.iter().map(|g| g.options.len()).sum();
        prop_assert_eq!(total, schema.options().len());

        let names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        let expected: Vec<String> = (0..sizes.len()).map(|i| format!("group{}", i)).collect();
        prop_assert_eq!(names, expected);

        let flattened: Vec<String> = groups
            .iter()
            .flat_map(|g| g.options.iter().map(|o| o.id.clone()))
            .collect();
        let declared: Vec<String> = schema.options().iter().map(|o| o.id.clone()).collect();
        prop_assert_eq!(flattened, declared);
    }
}

#[test]
fn test_config_data_flattens_values_and_groups() {
    let schema = range_schema();
    let mut values = BTreeMap::new();
    values.insert("range".to_string(), "100".to_string());

    let data = schema.config_data(Some(3), ConfigFlag::Update, &values);

    assert_eq!(data.node, Some(3));
    assert_eq!(data.object, "basic_range");
    assert_eq!(data.config_type, 2);
    assert_eq!(data.data_types, vec![7, 7, 7, 11, 9]);
    assert_eq!(
        data.data_values,
        "range=100|bandwidth=54000000|jitter=0|enabled=1|error=0.5"
    );
    assert_eq!(data.groups.as_deref(), Some("Range:1-3|Extras:4-5"));
    assert_eq!(data.possible_values.as_deref(), Some("|||On,Off|"));
}

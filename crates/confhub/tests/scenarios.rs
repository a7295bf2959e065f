//! End-to-end tests: real TOML and dotenv files in a temp directory
//!
//! Each test that touches the process environment uses its own variable
//! names, since tests run in parallel threads of one process.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use confhub::{
	Error, FieldType, Namespace, SelectOption, SettingField, SettingValue, SettingsConfig,
	SettingsHubBuilder, SettingsManager,
};

fn init_test_logging() {
	tracing_subscriber::fmt()
		.with_test_writer()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.try_init()
		.ok();
}

fn create_hub(dir: &Path, namespaces: Vec<Namespace>) -> Arc<SettingsManager> {
	init_test_logging();
	let mut builder = SettingsHubBuilder::with_config(SettingsConfig::in_dir(dir));
	for namespace in namespaces {
		builder.namespace(namespace);
	}
	builder.build().expect("Failed to build settings hub")
}

fn field(builder: confhub::schema::SettingFieldBuilder) -> SettingField {
	builder.build().expect("Failed to build field")
}

fn read(path: &Path) -> Option<String> {
	fs::read_to_string(path).ok()
}

#[test]
fn test_secret_goes_to_secrets_file_and_environment() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let config = SettingsConfig::in_dir(temp.path());
	fs::write(&config.document_path, "# hand written\n[other]\nx = 1\n")
		.expect("Failed to write settings file");

	let voice = Namespace::builder("voice_core")
		.field(field(
			SettingField::builder("api_key", FieldType::Password)
				.secret(true)
				.env_key("HUB_API_KEY"),
		))
		.build()
		.expect("Failed to build namespace");
	let hub = create_hub(temp.path(), vec![voice]);

	hub.set("voice_core", "api_key", "sk-123").expect("Failed to set secret");

	let secrets = read(&config.secrets_path).expect("Secrets file should exist");
	assert!(secrets.lines().any(|line| line == "HUB_API_KEY=sk-123"));
	assert_eq!(
		read(&config.document_path).as_deref(),
		Some("# hand written\n[other]\nx = 1\n")
	);
	assert_eq!(std::env::var("HUB_API_KEY").ok().as_deref(), Some("sk-123"));
}

#[test]
fn test_out_of_range_number_is_rejected() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let config = SettingsConfig::in_dir(temp.path());
	let ns = Namespace::builder("tuning")
		.field(field(SettingField::builder("ratio", FieldType::Number).min(0.0).max(1.0)))
		.build()
		.expect("Failed to build namespace");
	let hub = create_hub(temp.path(), vec![ns]);

	let result = hub.set("tuning", "ratio", 1.5);
	assert!(matches!(result, Err(Error::ValidationFailed { .. })));
	assert_eq!(hub.get("tuning", "ratio").ok(), Some(SettingValue::Int(0)));
	assert!(!config.document_path.exists());
}

#[test]
fn test_lower_order_tab_comes_first() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let general = Namespace::builder("general")
		.tab("General")
		.order(10)
		.build()
		.expect("Failed to build namespace");
	let voice = Namespace::builder("voice").tab("Voice").order(5).build().expect("Failed to build");
	let hub = create_hub(temp.path(), vec![general, voice]);

	let ids: Vec<String> = hub.namespaces().iter().map(|ns| ns.id.clone()).collect();
	assert_eq!(ids, vec!["voice", "general"]);

	let tabs: Vec<String> = hub.view().grouped_by_tab().into_iter().map(|g| g.tab).collect();
	assert_eq!(tabs, vec!["Voice", "General"]);
}

#[test]
fn test_provider_select_resolves_dependent_namespace() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let voice = Namespace::builder("voice")
		.field(field(
			SettingField::builder("stt_engine", FieldType::ProviderSelect)
				.option("leopard", "Leopard")
				.option("whisper", "Whisper")
				.provider_namespace_template("voice.stt.{value}"),
		))
		.build()
		.expect("Failed to build namespace");
	let leopard = Namespace::builder("voice.stt.leopard")
		.field(field(SettingField::builder("model_path", FieldType::FilePath)))
		.build()
		.expect("Failed to build namespace");
	let hub = create_hub(temp.path(), vec![voice, leopard]);

	hub.set("voice", "stt_engine", "leopard").expect("Failed to set");

	let dependent =
		hub.view().dependent_namespace("voice", "stt_engine").expect("Failed to resolve");
	assert_eq!(dependent.as_deref(), Some("voice.stt.leopard"));
	assert!(hub.namespace("voice.stt.leopard").is_some());

	// The dotted id survives a restart as a quoted table name
	hub.set("voice.stt.leopard", "model_path", "/models/leopard.pv").expect("Failed to set");
	drop(hub);
	let config = SettingsConfig::in_dir(temp.path());
	let content = read(&config.document_path).expect("Settings file should exist");
	assert!(content.contains(r#"["voice.stt.leopard"]"#));
}

fn every_field_type() -> Namespace {
	Namespace::builder("kitchen_sink")
		.field(field(SettingField::builder("text", FieldType::Text)))
		.field(field(SettingField::builder("password", FieldType::Password)))
		.field(field(SettingField::builder("number", FieldType::Number)))
		.field(field(SettingField::builder("float", FieldType::Number)))
		.field(field(SettingField::builder("checkbox", FieldType::Checkbox)))
		.field(field(
			SettingField::builder("select", FieldType::Select).option("a", "A").option("b", "B"),
		))
		.field(field(
			SettingField::builder("dynamic", FieldType::DynamicSelect)
				.options_provider(|| vec![SelectOption::new("x", "X"), SelectOption::new("y", "Y")]),
		))
		.field(field(
			SettingField::builder("provider", FieldType::ProviderSelect)
				.option("leopard", "Leopard")
				.provider_namespace_template("stt.{value}"),
		))
		.field(field(SettingField::builder("list", FieldType::List)))
		.field(field(
			SettingField::builder("action", FieldType::Action).metadata("action", "reindex"),
		))
		.field(field(SettingField::builder("multiline", FieldType::Multiline)))
		.field(field(SettingField::builder("file", FieldType::FilePath)))
		.field(field(SettingField::builder("directory", FieldType::DirectoryPath)))
		.field(field(SettingField::builder("color", FieldType::Color)))
		.field(field(SettingField::builder("slider", FieldType::Slider).min(0.0).max(1.0)))
		.field(field(SettingField::builder("date", FieldType::Date)))
		.field(field(SettingField::builder("time", FieldType::Time)))
		.field(field(SettingField::builder("datetime", FieldType::Datetime)))
		.field(field(
			SettingField::builder("secret_number", FieldType::Number)
				.secret(true)
				.env_key("CONFHUB_TEST_ROUNDTRIP_NUMBER"),
		))
		.field(field(
			SettingField::builder("secret_list", FieldType::List)
				.secret(true)
				.env_key("CONFHUB_TEST_ROUNDTRIP_LIST"),
		))
		.build()
		.expect("Failed to build namespace")
}

#[test]
fn test_every_field_type_round_trips_through_files() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let samples: Vec<(&str, SettingValue)> = vec![
		("text", "hello world".into()),
		("password", "p@ss word#1".into()),
		("number", 42.into()),
		("float", 2.5.into()),
		("checkbox", true.into()),
		("select", "b".into()),
		("dynamic", "y".into()),
		("provider", "leopard".into()),
		("list", vec!["one", "two"].into()),
		("action", "now".into()),
		("multiline", "line 1\nline \"2\"".into()),
		("file", "/tmp/confhub/settings.toml".into()),
		("directory", "/tmp/confhub".into()),
		("color", "#ff8800".into()),
		("slider", 0.25.into()),
		("date", "2024-02-29".into()),
		("time", "13:45".into()),
		("datetime", "2024-02-29T13:45:00Z".into()),
		("secret_number", 7.into()),
		("secret_list", vec!["a b", "c"].into()),
	];

	let hub = create_hub(temp.path(), vec![every_field_type()]);
	for (key, value) in &samples {
		hub.set("kitchen_sink", key, value.clone())
			.unwrap_or_else(|e| panic!("Failed to set {}: {}", key, e));
	}
	drop(hub);

	let reloaded = create_hub(temp.path(), vec![every_field_type()]);
	for (key, value) in &samples {
		assert_eq!(reloaded.get("kitchen_sink", key).ok().as_ref(), Some(value), "field {}", key);
	}
	assert_eq!(
		std::env::var("CONFHUB_TEST_ROUNDTRIP_LIST").ok().as_deref(),
		Some(r#"["a b","c"]"#)
	);
}

#[test]
fn test_same_key_in_two_namespaces_is_isolated() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let ns = |id: &str| {
		Namespace::builder(id)
			.field(field(SettingField::builder("model", FieldType::Text).default("base")))
			.build()
			.expect("Failed to build namespace")
	};
	let hub = create_hub(temp.path(), vec![ns("stt"), ns("tts")]);

	hub.set("stt", "model", "large").expect("Failed to set");
	drop(hub);

	let hub = create_hub(temp.path(), vec![ns("stt"), ns("tts")]);
	assert_eq!(hub.get_string("stt", "model").ok().as_deref(), Some("large"));
	assert_eq!(hub.get_string("tts", "model").ok().as_deref(), Some("base"));
}

#[test]
fn test_rejected_set_leaves_files_and_environment_unchanged() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let config = SettingsConfig::in_dir(temp.path());
	let ns = Namespace::builder("llm")
		.field(field(
			SettingField::builder("token", FieldType::Password)
				.secret(true)
				.env_key("CONFHUB_TEST_ATOMIC_TOKEN")
				.metadata("pattern", "^tok-"),
		))
		.field(field(SettingField::builder("temperature", FieldType::Slider).min(0.0).max(2.0)))
		.build()
		.expect("Failed to build namespace");
	let hub = create_hub(temp.path(), vec![ns]);

	hub.set("llm", "token", "tok-good").expect("Failed to set");
	hub.set("llm", "temperature", 0.7).expect("Failed to set");
	hub.register_validator("llm", "temperature", |v| {
		v.as_f64().filter(|t| *t > 1.0).map(|_| "too creative".to_string())
	})
	.expect("Failed to register validator");

	let secrets_before = read(&config.secrets_path);
	let document_before = read(&config.document_path);

	assert!(matches!(hub.set("llm", "token", "bad"), Err(Error::ValidationFailed { .. })));
	assert!(matches!(hub.set("llm", "temperature", 1.5), Err(Error::ValidationFailed { .. })));

	assert_eq!(read(&config.secrets_path), secrets_before);
	assert_eq!(read(&config.document_path), document_before);
	assert_eq!(std::env::var("CONFHUB_TEST_ATOMIC_TOKEN").ok().as_deref(), Some("tok-good"));
	assert_eq!(hub.get_string("llm", "token").ok().as_deref(), Some("tok-good"));
	assert_eq!(hub.get_float("llm", "temperature").ok(), Some(0.7));
}

#[test]
fn test_repeated_set_is_idempotent_on_disk() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let config = SettingsConfig::in_dir(temp.path());
	fs::write(
		&config.document_path,
		"# top\n[ui]\ntheme = \"dark\" # user choice\n\n[extra]\nkeep = true\n",
	)
	.expect("Failed to write settings file");
	fs::write(&config.secrets_path, "# secrets\nUNMANAGED=1\n").expect("Failed to write secrets");

	let ns = Namespace::builder("ui")
		.field(field(
			SettingField::builder("theme", FieldType::Select)
				.option("dark", "Dark")
				.option("light", "Light"),
		))
		.field(field(
			SettingField::builder("token", FieldType::Password)
				.secret(true)
				.env_key("CONFHUB_TEST_IDEMPOTENT"),
		))
		.build()
		.expect("Failed to build namespace");
	let hub = create_hub(temp.path(), vec![ns]);

	hub.set("ui", "theme", "light").expect("Failed to set");
	hub.set("ui", "token", "abc").expect("Failed to set");
	let document_once = read(&config.document_path);
	let secrets_once = read(&config.secrets_path);

	hub.set("ui", "theme", "light").expect("Failed to set");
	hub.set("ui", "token", "abc").expect("Failed to set");

	assert_eq!(read(&config.document_path), document_once);
	assert_eq!(read(&config.secrets_path), secrets_once);
	let document = document_once.expect("Settings file should exist");
	assert!(document.starts_with("# top\n[ui]\ntheme = \"light\""));
	assert!(document.contains("[extra]\nkeep = true\n"));
	assert_eq!(
		secrets_once.as_deref(),
		Some("# secrets\nUNMANAGED=1\nCONFHUB_TEST_IDEMPOTENT=abc\n")
	);
}

#[test]
fn test_corrupted_file_fails_at_build() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let config = SettingsConfig::in_dir(temp.path());
	fs::write(&config.secrets_path, "this is not a dotenv file\n").expect("Failed to write secrets");

	let result = SettingsHubBuilder::with_config(config).build();
	assert!(matches!(result, Err(Error::LoadCorrupted { .. })));
}

#[test]
fn test_unrepresentable_stored_value_fails_at_build() {
	init_test_logging();
	let temp = TempDir::new().expect("Failed to create temp directory");
	let config = SettingsConfig::in_dir(temp.path());
	let content = "[tuning]\nratio = { x = 1 }\n";
	fs::write(&config.document_path, content).expect("Failed to write settings file");

	let ns = Namespace::builder("tuning")
		.field(field(SettingField::builder("ratio", FieldType::Number).default(3)))
		.build()
		.expect("Failed to build namespace");
	let result = SettingsHubBuilder::with_config(config.clone()).namespace(ns).build();

	assert!(matches!(result, Err(Error::LoadCorrupted { .. })));
	assert_eq!(read(&config.document_path).as_deref(), Some(content));
}

#[test]
fn test_listeners_observe_committed_values() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let config = SettingsConfig::in_dir(temp.path());
	let ns = Namespace::builder("audio")
		.field(field(SettingField::builder("muted", FieldType::Checkbox)))
		.build()
		.expect("Failed to build namespace");
	let hub = create_hub(temp.path(), vec![ns]);

	let seen = Arc::new(Mutex::new(Vec::new()));
	let log = seen.clone();
	let path = config.document_path.clone();
	hub.on_change(move |ns, key, value| {
		// Write-through: the file already holds the value
		let on_disk = fs::read_to_string(&path).map_err(Error::from)?;
		let persisted = on_disk.contains("muted = true");
		log.lock().push((format!("{}.{}", ns, key), value.clone(), persisted));
		Ok(())
	});

	hub.set("audio", "muted", "true").expect("Failed to set");
	assert_eq!(*seen.lock(), vec![("audio.muted".to_string(), SettingValue::Bool(true), true)]);
}

#[test]
fn test_concurrent_sets_keep_files_consistent() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let mut builder = Namespace::builder("workers");
	for i in 0..8 {
		builder =
			builder.field(field(SettingField::builder(format!("slot_{}", i), FieldType::Number)));
	}
	let ns = builder.build().expect("Failed to build namespace");
	let hub = create_hub(temp.path(), vec![ns.clone()]);

	std::thread::scope(|scope| {
		for i in 0..8_i64 {
			let hub = &hub;
			scope.spawn(move || {
				for round in 0..10_i64 {
					hub.set("workers", &format!("slot_{}", i), i * 100 + round)
						.unwrap_or_else(|e| panic!("Failed to set slot {}: {}", i, e));
				}
			});
		}
	});
	drop(hub);

	let reloaded = create_hub(temp.path(), vec![ns]);
	for i in 0..8_i64 {
		assert_eq!(reloaded.get_int("workers", &format!("slot_{}", i)).ok(), Some(i * 100 + 9));
	}
}

#[test]
fn test_builder_registers_providers() {
	let temp = TempDir::new().expect("Failed to create temp directory");
	let hub = SettingsHubBuilder::with_config(SettingsConfig::in_dir(temp.path()))
		.provider(|| {
			Namespace::builder("wakeword")
				.tab("Voice")
				.field(SettingField::builder("phrase", FieldType::Text).default("hey hub").build()?)
				.build()
		})
		.build()
		.expect("Failed to build settings hub");

	assert_eq!(hub.get_string("wakeword", "phrase").ok().as_deref(), Some("hey hub"));
}

// vim: ts=4

//! Session option, mobility and EMANE configuration tests for the RPC daemon.

use super::{new_node, TestServer};
use crate::rpc::wire::{ConfigGroup, ConfigMap, NewNode};
use crate::rpc::ApiError;
use tarpc::context;

fn value_of(groups: &[ConfigGroup], name: &str) -> Option<String> {
    groups
        .iter()
        .flat_map(|group| group.options.iter())
        .find(|option| option.name == name)
        .map(|option| option.value.clone())
}

fn config(pairs: &[(&str, &str)]) -> ConfigMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[tokio::test]
async fn test_session_options_merge_and_reject_bad_values() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;

    let groups = client
        .get_session_options(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Options");
    assert_eq!(value_of(&groups, "preservedir").as_deref(), Some("0"));

    assert!(client
        .set_session_options(context::current(), session_id, config(&[("preservedir", "1")]))
        .await
        .unwrap()
        .unwrap());
    assert!(!client
        .set_session_options(context::current(), session_id, config(&[("enablerj45", "maybe")]))
        .await
        .unwrap()
        .unwrap());

    let groups = client
        .get_session_options(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value_of(&groups, "preservedir").as_deref(), Some("1"));
    assert_eq!(value_of(&groups, "enablerj45").as_deref(), Some("1"));
}

#[tokio::test]
async fn test_metadata_is_replaced_wholesale() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;

    let first = config(&[("canvas", "c1"), ("author", "ops")]);
    client
        .set_session_metadata(context::current(), session_id, first)
        .await
        .unwrap()
        .unwrap();
    let second = config(&[("canvas", "c2")]);
    client
        .set_session_metadata(context::current(), session_id, second.clone())
        .await
        .unwrap()
        .unwrap();

    let metadata = client
        .get_session_metadata(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata, second);
}

#[tokio::test]
async fn test_wlan_config_defaults_then_updates() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;
    let wlan = NewNode {
        id: Some(5),
        name: "wlan5".to_string(),
        node_type: 6,
        ..NewNode::default()
    };
    client
        .create_node(context::current(), session_id, wlan)
        .await
        .unwrap()
        .unwrap();

    let groups = client
        .get_wlan_config(context::current(), session_id, 5)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value_of(&groups, "range").as_deref(), Some("275"));

    assert!(client
        .set_wlan_config(context::current(), session_id, 5, config(&[("range", "400")]))
        .await
        .unwrap()
        .unwrap());
    assert!(!client
        .set_wlan_config(context::current(), session_id, 5, config(&[("range", "far")]))
        .await
        .unwrap()
        .unwrap());

    let groups = client
        .get_wlan_config(context::current(), session_id, 5)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value_of(&groups, "range").as_deref(), Some("400"));
    assert_eq!(value_of(&groups, "delay").as_deref(), Some("5000"));
}

#[tokio::test]
async fn test_mobility_configs_list_scripted_nodes() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;
    client
        .create_node(context::current(), session_id, new_node(1, "n1"))
        .await
        .unwrap()
        .unwrap();

    assert!(client
        .get_mobility_configs(context::current(), session_id)
        .await
        .unwrap()
        .unwrap()
        .is_empty());

    assert!(client
        .set_mobility_config(context::current(), session_id, 1, config(&[("file", "walk.scen")]))
        .await
        .unwrap()
        .unwrap());

    let configs = client
        .get_mobility_configs(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].node_id, 1);
    assert_eq!(configs[0].model, "ns2script");
    assert_eq!(value_of(&configs[0].groups, "file").as_deref(), Some("walk.scen"));
}

#[tokio::test]
async fn test_mobility_action_reaches_emulator() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;
    client
        .create_node(context::current(), session_id, new_node(1, "n1"))
        .await
        .unwrap()
        .unwrap();
    client
        .set_mobility_config(context::current(), session_id, 1, ConfigMap::new())
        .await
        .unwrap()
        .unwrap();

    assert!(client
        .mobility_action(context::current(), session_id, 1, 0)
        .await
        .unwrap()
        .unwrap());
    assert!(!client
        .mobility_action(context::current(), session_id, 1, 9)
        .await
        .unwrap()
        .unwrap());
    assert_eq!(server.fakes.emulator.mobility.lock().unwrap().len(), 1);

    let result = client
        .mobility_action(context::current(), session_id, 4, 0)
        .await
        .unwrap();
    assert_eq!(
        result,
        Err(ApiError::NodeNotFound {
            session_id,
            node_id: 4
        })
    );
}

#[tokio::test]
async fn test_emane_models_and_configs() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;

    let models = client
        .get_emane_models(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert!(models.contains(&"emane_rfpipe".to_string()));
    assert!(models.iter().all(|model| model.starts_with("emane_")));

    let emane = NewNode {
        id: Some(3),
        name: "emane3".to_string(),
        node_type: 10,
        ..NewNode::default()
    };
    client
        .create_node(context::current(), session_id, emane)
        .await
        .unwrap()
        .unwrap();
    assert!(client
        .set_emane_model_config(
            context::current(),
            session_id,
            3,
            "emane_rfpipe".to_string(),
            config(&[("bandwidth", "2000000")]),
        )
        .await
        .unwrap()
        .unwrap());

    let groups = client
        .get_emane_model_config(context::current(), session_id, 3, "emane_rfpipe".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value_of(&groups, "bandwidth").as_deref(), Some("2000000"));

    let configs = client
        .get_emane_model_configs(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(configs.len(), 1);
    assert_eq!((configs[0].node_id, configs[0].model.as_str()), (3, "emane_rfpipe"));

    let result = client
        .get_emane_model_config(context::current(), session_id, 3, "emane_unknown".to_string())
        .await
        .unwrap();
    assert!(matches!(result, Err(ApiError::InvalidRequest { .. })));
}

#[tokio::test]
async fn test_emane_global_config_round_trips() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;

    let groups = client
        .get_emane_config(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value_of(&groups, "nem_id_start").as_deref(), Some("1"));

    assert!(client
        .set_emane_config(context::current(), session_id, config(&[("nem_id_start", "10")]))
        .await
        .unwrap()
        .unwrap());

    let groups = client
        .get_emane_config(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value_of(&groups, "nem_id_start").as_deref(), Some("10"));
}

#[tokio::test]
async fn test_model_configs_require_existing_node() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;
    let missing = Err(ApiError::NodeNotFound {
        session_id,
        node_id: 99,
    });

    let wlan = client
        .set_wlan_config(context::current(), session_id, 99, config(&[("range", "400")]))
        .await
        .unwrap();
    assert_eq!(wlan, missing);
    let mobility = client
        .set_mobility_config(context::current(), session_id, 99, ConfigMap::new())
        .await
        .unwrap();
    assert_eq!(mobility, missing);
    let emane = client
        .set_emane_model_config(
            context::current(),
            session_id,
            99,
            "emane_rfpipe".to_string(),
            ConfigMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(emane, missing);

    assert!(client
        .get_mobility_configs(context::current(), session_id)
        .await
        .unwrap()
        .unwrap()
        .is_empty());
    assert!(client
        .get_emane_model_configs(context::current(), session_id)
        .await
        .unwrap()
        .unwrap()
        .is_empty());
}

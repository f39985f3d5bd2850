use widerow::plainbuffer::{encode_primary_key, encode_put};
use widerow::protocol::{self, Api};
use widerow::security::base64_encode;
use widerow::types::*;
use widerow::{Action, ErrorCode};

fn pk(value: i64) -> PrimaryKey {
    PrimaryKey::new(vec![PrimaryKeyColumn::new(
        "pk",
        PrimaryKeyValue::Integer(value),
    )])
}

#[test]
fn action_paths_are_fixed() {
    assert_eq!(Action::ListTable.path(), "/ListTable");
    assert_eq!(Action::PutRow.path(), "/PutRow");
    assert_eq!(Action::BatchWriteRow.path(), "/BatchWriteRow");
    assert_eq!(Action::GetRange.path(), "/GetRange");
    assert_eq!(Action::ComputeSplitsBySize.path(), "/ComputeSplitPointsBySize");
    let paths: std::collections::HashSet<&str> =
        Action::all().iter().map(|action| action.path()).collect();
    assert_eq!(paths.len(), Action::all().len(), "paths are distinct");
}

#[test]
fn get_range_envelope_embeds_plainbuffer_boundaries() {
    let criterion = RangeQueryCriterion {
        table: "t".to_string(),
        inclusive_start: pk(0),
        exclusive_end: pk(9),
        limit: Some(4),
        ..Default::default()
    };
    let body = protocol::GetRange::encode(&GetRangeRequest {
        query_criterion: criterion,
    })
    .unwrap();
    let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope["table"], "t");
    assert_eq!(envelope["direction"], "FORWARD");
    assert_eq!(envelope["limit"], 4);
    let start_b64 = envelope["inclusive_start_b64"].as_str().unwrap();
    assert_eq!(start_b64, base64_encode(&encode_primary_key(&pk(0)).unwrap()));
}

#[test]
fn get_range_decode_reads_rows_and_continuation() {
    let change = RowPutChange {
        table: "t".to_string(),
        primary_key: pk(0),
        ..Default::default()
    };
    let rows_b64 = base64_encode(&encode_put(&change).unwrap());
    let next_b64 = base64_encode(&encode_primary_key(&pk(1)).unwrap());
    let body = format!(
        "{{\"consumed\":{{\"read\":3}},\"rows_b64\":\"{rows_b64}\",\"next_start_b64\":\"{next_b64}\"}}"
    );
    let response = protocol::GetRange::decode(body.as_bytes()).unwrap();
    assert_eq!(response.rows.len(), 1);
    assert_eq!(response.rows[0].primary_key, pk(0));
    assert_eq!(response.next_start, Some(pk(1)));
    assert_eq!(response.consumed_capacity.read, Some(3));
}

#[test]
fn batch_write_correlate_copies_user_data_positionally() {
    let mut request = BatchWriteRowRequest::default();
    request.puts.push(WithUserData::tagged(
        RowPutChange::new("t", pk(0)),
        7,
    ));
    request.deletes.push(WithUserData::tagged(
        RowDeleteChange::new("t", pk(1)),
        9,
    ));
    let body = "{\"put_results\":[{\"is_ok\":true}],\
                \"delete_results\":[{\"is_ok\":false,\"error_code\":\"OTSConditionCheckFail\",\
                \"error_message\":\"no\"}]}";
    let mut response = protocol::BatchWriteRow::decode(body.as_bytes()).unwrap();
    protocol::BatchWriteRow::correlate(&request, &mut response);
    assert_eq!(response.put_results[0].user_data, Some(7));
    assert_eq!(response.delete_results[0].user_data, Some(9));
    assert!(response.put_results[0].data.is_ok());
    let err = response.delete_results[0].data.as_ref().unwrap_err();
    assert_eq!(err.code, ErrorCode::OtsConditionCheckFail);
}

#[test]
fn error_envelopes_translate_to_typed_errors() {
    let err = protocol::decode_error(
        503,
        b"{\"error_code\":\"OTSServerBusy\",\"message\":\"try later\"}",
    );
    assert_eq!(err.code, ErrorCode::OtsServerBusy);
    assert_eq!(err.http_status, 503);
    assert_eq!(err.message, "try later");

    // unknown codes and garbage bodies still surface the status
    let err = protocol::decode_error(500, b"{\"error_code\":\"WhoKnows\",\"message\":\"m\"}");
    assert_eq!(err.code, ErrorCode::OtsClientUnknown);
    assert_eq!(err.http_status, 500);
    let err = protocol::decode_error(502, b"<html>bad gateway</html>");
    assert_eq!(err.code, ErrorCode::OtsClientUnknown);
    assert_eq!(err.http_status, 502);
}

#[test]
fn describe_table_decodes_schema_and_status() {
    let body = "{\"table_meta\":{\"table_name\":\"t\",\"primary_key_schema\":\
                [{\"name\":\"pk\",\"type\":\"INTEGER\",\"auto_increment\":true},\
                {\"name\":\"s\",\"type\":\"STRING\"}]},\
                \"options\":{\"max_versions\":3},\"status\":\"LOADING\"}";
    let response = protocol::DescribeTable::decode(body.as_bytes()).unwrap();
    assert_eq!(response.table_meta.table_name, "t");
    assert_eq!(response.table_meta.schema.len(), 2);
    assert!(response.table_meta.schema.columns[0].auto_increment);
    assert_eq!(
        response.table_meta.schema.columns[1].key_type,
        PrimaryKeyType::Str
    );
    assert_eq!(response.options.max_versions, Some(3));
    assert_eq!(response.status, TableStatus::Loading);
}

#[test]
fn batch_get_flattens_results_across_tables() {
    let body = "{\"tables\":[{\"rows\":[{\"is_ok\":true}]},{\"rows\":[{\"is_ok\":true},\
                {\"is_ok\":false,\"error_code\":\"OTSObjectNotExist\"}]}]}";
    let response = protocol::BatchGetRow::decode(body.as_bytes()).unwrap();
    assert_eq!(response.results.len(), 3);
    assert!(response.results[2].data.is_err());
}

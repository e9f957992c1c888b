use super::*;
use crate::{
    config::ClusteringMode,
    error::CursorError,
    row::{RawRow, RowGroup},
    test_support::tag_rows,
    value::Value,
};
use proptest::prelude::*;

fn group_all(
    grouper: &mut JoinRowGrouper,
    rows: Vec<RawRow>,
) -> Result<Vec<RowGroup>, CursorError> {
    let mut groups = Vec::new();
    for row in rows {
        groups.extend(grouper.push(row)?);
    }
    groups.extend(grouper.finish());

    Ok(groups)
}

fn group_of(rows: Vec<RawRow>) -> RowGroup {
    let mut rows = rows.into_iter();
    let mut group = RowGroup::new(rows.next().unwrap());
    rows.for_each(|row| group.push(row));

    group
}

fn tags_shape() -> JoinShape {
    JoinShape::new(RootKey::column("root_id"))
        .association(AssociationSpec::prefixed("tags", "tags."))
}

//
// Grouper
//

#[test]
fn contiguous_keys_form_one_group_each() {
    let mut grouper = JoinRowGrouper::new(RootKey::column("root_id"), ClusteringMode::Assume);
    let groups = group_all(&mut grouper, tag_rows(&[(1, "x"), (1, "y"), (2, "z")])).unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[1].len(), 1);
    assert_eq!(groups[1].first_row().get("tags.tag"), Some(&Value::from("z")));
}

#[test]
fn group_is_emitted_only_when_the_key_changes() {
    let mut grouper = JoinRowGrouper::new(RootKey::column("root_id"), ClusteringMode::Assume);
    let mut rows = tag_rows(&[(1, "x"), (1, "y"), (2, "z")]).into_iter();

    assert!(grouper.push(rows.next().unwrap()).unwrap().is_none());
    assert!(grouper.push(rows.next().unwrap()).unwrap().is_none());
    assert_eq!(grouper.buffered_rows(), 2);

    let first = grouper.push(rows.next().unwrap()).unwrap().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(grouper.buffered_rows(), 1);

    assert_eq!(grouper.finish().unwrap().len(), 1);
    assert!(grouper.finish().is_none());
}

#[test]
fn empty_stream_yields_no_groups() {
    let mut grouper = JoinRowGrouper::new(RootKey::column("root_id"), ClusteringMode::Verify);

    assert!(grouper.finish().is_none());
}

#[test]
fn interleaved_keys_split_into_separate_groups_when_assumed() {
    let mut grouper = JoinRowGrouper::new(RootKey::column("root_id"), ClusteringMode::Assume);
    let groups = group_all(&mut grouper, tag_rows(&[(1, "x"), (2, "y"), (1, "z")])).unwrap();

    assert_eq!(groups.len(), 3);
}

#[test]
fn interleaved_keys_are_reported_when_verified() {
    let mut grouper = JoinRowGrouper::new(RootKey::column("root_id"), ClusteringMode::Verify);
    let err = group_all(&mut grouper, tag_rows(&[(1, "x"), (2, "y"), (1, "z")])).unwrap_err();

    assert!(matches!(err, CursorError::NonClusteredKey { ref key } if key == "1"));
}

#[test]
fn missing_root_key_column_is_an_error() {
    let mut grouper = JoinRowGrouper::new(RootKey::column("root_id"), ClusteringMode::Assume);
    let err = grouper
        .push(RawRow::from_pairs([("id", Value::Int(1))]))
        .unwrap_err();

    assert!(matches!(err, CursorError::MissingColumn { ref column } if column == "root_id"));
}

#[test]
fn composite_keys_compare_as_tuples() {
    let key = RootKey::composite(["tenant", "id"]);
    let rows = [(1, 1), (1, 1), (1, 2), (2, 2)]
        .into_iter()
        .map(|(tenant, id)| RawRow::from_pairs([("tenant", tenant), ("id", id)]))
        .collect();

    let mut grouper = JoinRowGrouper::new(key.clone(), ClusteringMode::Verify);
    let groups = group_all(&mut grouper, rows).unwrap();

    assert_eq!(
        groups.iter().map(|g| g.len()).collect::<Vec<_>>(),
        vec![2, 1, 1]
    );
    assert_eq!(
        key.key_of(groups[1].first_row()).unwrap().to_string(),
        "(1, 2)"
    );
}

//
// Materializer
//

#[test]
fn materializer_attaches_association_rows_to_the_root() {
    let shape = tags_shape();
    let mut grouper = JoinRowGrouper::new(shape.root_key().clone(), ClusteringMode::Assume);
    let groups = group_all(&mut grouper, tag_rows(&[(1, "x"), (1, "y"), (2, "z")])).unwrap();

    let entities: Vec<_> = groups
        .into_iter()
        .map(|group| EntityMaterializer::new(&shape).materialize(group))
        .collect();

    assert_eq!(entities[0].root(), &RawRow::from_pairs([("root_id", 1)]));
    let tags: Vec<_> = entities[0]
        .association("tags")
        .unwrap()
        .iter()
        .map(|row| row.get("tag").cloned().unwrap())
        .collect();
    assert_eq!(tags, vec![Value::from("x"), Value::from("y")]);

    assert_eq!(entities[1].association("tags").unwrap().len(), 1);
    assert!(entities[1].association("comments").is_none());
}

#[test]
fn outer_join_misses_leave_an_empty_collection() {
    let shape = tags_shape();
    let group = group_of(vec![RawRow::from_pairs([
        ("root_id", Value::Int(9)),
        ("tags.tag", Value::Null),
    ])]);

    let entity = EntityMaterializer::new(&shape).materialize(group);

    assert_eq!(entity.association("tags"), Some(&[][..]));
    assert_eq!(entity.require("root_id").unwrap(), &Value::Int(9));
}

#[test]
fn keyed_associations_collapse_cartesian_repeats() {
    // post 1 has tags {a, b} and comments {c1, c2}: the join yields 4 rows.
    let shape = JoinShape::new(RootKey::column("id"))
        .association(AssociationSpec::prefixed("tags", "tags.").keyed_by(["name"]))
        .association(
            AssociationSpec::columns("comments", ["comment_body"]).keyed_by(["comment_body"]),
        );
    let rows = [("a", "c1"), ("a", "c2"), ("b", "c1"), ("b", "c2")]
        .into_iter()
        .map(|(tag, body)| {
            RawRow::from_pairs([
                ("id", Value::Int(1)),
                ("title", Value::from("hello")),
                ("tags.name", Value::from(tag)),
                ("comment_body", Value::from(body)),
            ])
        })
        .collect();

    let entity = EntityMaterializer::new(&shape).materialize(group_of(rows));

    assert_eq!(
        entity.root(),
        &RawRow::from_pairs([("id", Value::Int(1)), ("title", Value::from("hello"))])
    );
    assert_eq!(entity.association("tags").unwrap().len(), 2);
    assert_eq!(
        entity.association("comments").unwrap(),
        &[
            RawRow::from_pairs([("comment_body", "c1")]),
            RawRow::from_pairs([("comment_body", "c2")]),
        ][..]
    );
}

#[test]
fn unkeyed_associations_keep_identical_child_rows() {
    let shape = JoinShape::new(RootKey::column("root_id"))
        .association(AssociationSpec::columns("tags", ["tag"]));
    let rows = vec![
        RawRow::from_pairs([("root_id", Value::Int(1)), ("tag", Value::from("x"))]),
        RawRow::from_pairs([("root_id", Value::Int(1)), ("tag", Value::from("x"))]),
    ];

    let entity = EntityMaterializer::new(&shape).materialize(group_of(rows));

    assert_eq!(entity.association("tags").unwrap().len(), 2);
}

#[test]
fn child_keys_are_scoped_to_one_group() {
    let shape = JoinShape::new(RootKey::column("root_id"))
        .association(AssociationSpec::prefixed("tags", "tags.").keyed_by(["tag"]));
    let materializer = EntityMaterializer::new(&shape);

    let first = materializer.materialize(group_of(tag_rows(&[(1, "x"), (1, "x")])));
    let second = materializer.materialize(group_of(tag_rows(&[(2, "x")])));

    assert_eq!(first.association("tags").unwrap().len(), 1);
    assert_eq!(second.association("tags").unwrap().len(), 1);
}

#[test]
fn closures_act_as_mappers() {
    let mapper = |entity: MaterializedEntity| -> Result<i64, MapperError> {
        let id = entity.require("id")?;
        id.as_int()
            .ok_or_else(|| MapperError::type_mismatch("id", "int", id))
    };

    let ok = mapper.instantiate(MaterializedEntity::flat(RawRow::from_pairs([("id", 5)])));
    let bad = mapper.instantiate(MaterializedEntity::flat(RawRow::from_pairs([("id", "x")])));

    assert_eq!(ok.unwrap(), 5);
    assert_eq!(bad.unwrap_err().message, "column 'id' expected int, found 'x'");
}

proptest! {
    #[test]
    fn clustered_streams_yield_one_group_per_distinct_key(
        sizes in prop::collection::vec(1usize..5, 0..20)
    ) {
        let rows: Vec<RawRow> = sizes
            .iter()
            .enumerate()
            .flat_map(|(key, &size)| {
                (0..size).map(move |n| {
                    RawRow::from_pairs([("root_id", key as i64), ("tags.n", n as i64)])
                })
            })
            .collect();

        let mut grouper = JoinRowGrouper::new(RootKey::column("root_id"), ClusteringMode::Verify);
        let groups = group_all(&mut grouper, rows).unwrap();

        prop_assert_eq!(groups.len(), sizes.len());
        for (key, (group, &size)) in groups.iter().zip(&sizes).enumerate() {
            prop_assert_eq!(group.len(), size);
            prop_assert!(group
                .iter()
                .all(|row| row.get("root_id") == Some(&Value::Int(key as i64))));
        }
    }
}

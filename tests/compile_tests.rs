//! Compilation integration tests
//!
//! Each test loads one or more schema documents into a fresh manager and
//! checks the resolved model and the reported diagnostics.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use edmschema::namespaces::{
    CSDL_V1_1_NAMESPACE, CSDL_V2_NAMESPACE, CSDL_V3_NAMESPACE, PROVIDER_MANIFEST_NAMESPACE,
    SSDL_V1_NAMESPACE, SSDL_V2_NAMESPACE,
};
use edmschema::schema::{FacetName, FacetValue, ManifestCatalog, Multiplicity, ProviderManifest};
use edmschema::{CompileOptions, CompileState, Diagnostic, ErrorCode, Limits, NodeId, NodeKind, SchemaManager};

// ============================================================================
// Fixtures
// ============================================================================

const CUSTOMER: &str = r#"
    <EntityType Name="Customer">
      <Key><PropertyRef Name="Id" /></Key>
      <Property Name="Id" Type="Int32" Nullable="false" />
      <Property Name="Name" Type="String" MaxLength="100" />
    </EntityType>"#;

const ORDER: &str = r#"
    <EntityType Name="Order">
      <Key><PropertyRef Name="Id" /></Key>
      <Property Name="Id" Type="Int32" Nullable="false" />
      <Property Name="CustomerId" Type="Int32" Nullable="false" />
    </EntityType>"#;

const CUSTOMER_ORDERS: &str = r#"
    <Association Name="CustomerOrders">
      <End Role="Customer" Type="Self.Customer" />
      <End Role="Order" Type="Self.Order" />
      <ReferentialConstraint>
        <Principal Role="Customer"><PropertyRef Name="Id" /></Principal>
        <Dependent Role="Order"><PropertyRef Name="CustomerId" /></Dependent>
      </ReferentialConstraint>
    </Association>"#;

fn csdl_with(grammar: &str, namespace: &str, body: &str) -> String {
    format!(
        r#"<Schema xmlns="{}" Namespace="{}" Alias="Self">{}
</Schema>"#,
        grammar, namespace, body
    )
}

fn csdl(body: &str) -> String {
    csdl_with(CSDL_V2_NAMESPACE, "Shop", body)
}

fn ssdl(grammar: &str, namespace: &str, body: &str) -> String {
    format!(
        r#"<Schema xmlns="{}" Namespace="{}" Alias="Self" Provider="Acme.Client" ProviderManifestToken="2024">{}
</Schema>"#,
        grammar, namespace, body
    )
}

fn compile(documents: &[(&str, String)]) -> SchemaManager {
    let mut manager = SchemaManager::new();
    for (location, xml) in documents {
        manager.load_str(xml, location);
    }
    manager.compile();
    manager
}

fn codes(manager: &SchemaManager) -> Vec<ErrorCode> {
    manager.diagnostics().items().iter().map(|d| d.code).collect()
}

fn member(manager: &SchemaManager, owner: NodeId, name: &str) -> NodeId {
    manager.model().find_member(owner, name).unwrap()
}

fn end_multiplicity(manager: &SchemaManager, association: NodeId, role: &str) -> Option<Multiplicity> {
    let end = member(manager, association, role);
    match &manager.model()[end].kind {
        NodeKind::AssociationEnd(data) => data.effective_multiplicity(),
        other => panic!("not an end: {:?}", other),
    }
}

// ============================================================================
// Whole models
// ============================================================================

#[test]
fn test_valid_model_compiles() {
    let body = format!(
        r#"{}{}{}
    <EntityContainer Name="ShopContainer">
      <EntitySet Name="Customers" EntityType="Self.Customer" />
      <EntitySet Name="Orders" EntityType="Self.Order" />
      <AssociationSet Name="CustomerOrders" Association="Self.CustomerOrders" />
    </EntityContainer>"#,
        CUSTOMER, ORDER, CUSTOMER_ORDERS
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);

    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());
    assert_eq!(manager.state(), CompileState::Validated);
    assert!(manager.is_compiled());

    let customer = manager.lookup_type("Shop.Customer").unwrap();
    let name = member(&manager, customer, "Name");
    let usage = manager.model()[name].kind.type_usage().unwrap();
    assert_eq!(usage.resolved, manager.lookup_type("Edm.String"));
    assert_eq!(
        usage.resolved_facets.get(&FacetName::MaxLength),
        Some(&FacetValue::Integer(100))
    );

    let association = manager.lookup_type("Shop.CustomerOrders").unwrap();
    assert_eq!(end_multiplicity(&manager, association, "Customer"), Some(Multiplicity::One));
    assert_eq!(end_multiplicity(&manager, association, "Order"), Some(Multiplicity::Many));
}

#[test]
fn test_diagnostics_are_deterministic() {
    let body = format!(
        r#"{}
    <EntityType Name="Broken">
      <Property Name="A" Type="Nowhere.Thing" />
      <Property Name="B" Type="Self.Missing" />
      <Property Name="C" Type="Decimal" Precision="4" Scale="9" />
    </EntityType>
    <EntityContainer Name="ShopContainer">
      <EntitySet Name="Customers" EntityType="Self.Customer" />
      <EntitySet Name="Ghosts" EntityType="Self.Ghost" />
    </EntityContainer>"#,
        CUSTOMER
    );
    let documents = [("shop.csdl", csdl(&body))];
    let first: Vec<Diagnostic> = compile(&documents).diagnostics().items().to_vec();
    let second: Vec<Diagnostic> = compile(&documents).diagnostics().items().to_vec();

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(
        first.iter().map(|d| d.code).collect::<Vec<_>>(),
        vec![ErrorCode::BadNamespace, ErrorCode::NotInNamespace, ErrorCode::NotInNamespace]
    );
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn test_alias_and_namespace_resolve_to_same_type() {
    let body = format!(
        r#"{}
    <ComplexType Name="Refs">
      <Property Name="ByAlias" Type="Collection(Self.Address)" />
      <Property Name="ByNamespace" Type="Shop.Address" />
    </ComplexType>
    <ComplexType Name="Address">
      <Property Name="City" Type="String" />
    </ComplexType>"#,
        CUSTOMER
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());

    let refs = manager.lookup_type("Shop.Refs").unwrap();
    let address = manager.lookup_type("Shop.Address");
    let by_alias = manager.model()[member(&manager, refs, "ByAlias")].kind.type_usage().unwrap();
    let by_namespace = manager.model()[member(&manager, refs, "ByNamespace")].kind.type_usage().unwrap();
    assert!(by_alias.collection);
    assert_eq!(by_alias.resolved, address);
    assert_eq!(by_namespace.resolved, address);
}

#[test]
fn test_unknown_qualifier_is_bad_namespace() {
    let body = r#"
    <ComplexType Name="Holder">
      <Property Name="Value" Type="Bogus.Address" />
    </ComplexType>"#;
    let manager = compile(&[("shop.csdl", csdl(body))]);

    assert_eq!(codes(&manager), vec![ErrorCode::BadNamespace]);
    let diagnostic = &manager.diagnostics().items()[0];
    assert_eq!(diagnostic.source_location.as_deref(), Some("shop.csdl"));
    assert_eq!(diagnostic.line, 3);
    assert_eq!(manager.state(), CompileState::Parsed);
}

#[test]
fn test_case_mismatch_suggests_registered_name() {
    let body = format!(
        r#"{}
    <ComplexType Name="Holder">
      <Property Name="Value" Type="Self.customer" />
    </ComplexType>"#,
        CUSTOMER
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);

    assert_eq!(codes(&manager), vec![ErrorCode::NotInNamespace]);
    assert!(manager.diagnostics().items()[0]
        .message
        .contains("Did you mean 'Shop.Customer'?"));
}

#[test]
fn test_unqualified_non_primitive_name() {
    let manager = compile(&[(
        "shop.csdl",
        csdl(r#"<ComplexType Name="Holder"><Property Name="Value" Type="Holder" /></ComplexType>"#),
    )]);
    assert_eq!(codes(&manager), vec![ErrorCode::NotNamespaceQualified]);
}

#[test]
fn test_cross_document_reference_and_using() {
    let sales = csdl_with(
        CSDL_V2_NAMESPACE,
        "Sales",
        r#"
    <Using Namespace="Shop" Alias="S" />
    <EntityType Name="Invoice">
      <Key><PropertyRef Name="Id" /></Key>
      <Property Name="Id" Type="Int32" Nullable="false" />
    </EntityType>
    <ComplexType Name="Billing">
      <Property Name="Payer" Type="S.Address" Nullable="false" />
      <Property Name="Customer" Type="S.Customer" />
    </ComplexType>"#,
    );
    let shop = csdl(&format!(
        r#"{}
    <ComplexType Name="Address">
      <Property Name="City" Type="String" />
    </ComplexType>"#,
        CUSTOMER
    ));
    let manager = compile(&[("shop.csdl", shop), ("sales.csdl", sales)]);
    assert_eq!(codes(&manager), vec![ErrorCode::InvalidPropertyType]);
    assert_eq!(
        manager.diagnostics().items()[0].source_location.as_deref(),
        Some("sales.csdl")
    );

    let billing = manager.lookup_type("Sales.Billing").unwrap();
    let payer = manager.model()[member(&manager, billing, "Payer")].kind.type_usage().unwrap();
    assert_eq!(payer.resolved, manager.lookup_type("Shop.Address"));
}

#[test]
fn test_missing_name_and_type() {
    let manager = compile(&[("shop.csdl", csdl(r#"<ComplexType><Property Name="V" /></ComplexType>"#))]);
    assert_eq!(
        codes(&manager),
        vec![ErrorCode::MissingName, ErrorCode::RequiredAttributeMissing]
    );
}

#[test]
fn test_using_unknown_namespace() {
    let body = r#"<Using Namespace="Elsewhere" Alias="E" />"#;
    let manager = compile(&[("shop.csdl", csdl(body))]);
    assert_eq!(codes(&manager), vec![ErrorCode::UnknownUsingNamespace]);
}

// ============================================================================
// Type hierarchy
// ============================================================================

#[test]
fn test_base_type_cycle_reported_once() {
    let body = r#"
    <EntityType Name="A" BaseType="Self.B" />
    <EntityType Name="B" BaseType="Self.C" />
    <EntityType Name="C" BaseType="Self.A" />"#;
    let manager = compile(&[("shop.csdl", csdl(body))]);

    assert_eq!(codes(&manager), vec![ErrorCode::CycleInTypeHierarchy]);
    let diagnostic = &manager.diagnostics().items()[0];
    assert!(diagnostic.message.contains("'Self.A'"), "{}", diagnostic.message);
    assert_eq!(diagnostic.line, 4);

    let model = manager.model();
    let a = manager.lookup_type("Shop.A").unwrap();
    let b = manager.lookup_type("Shop.B").unwrap();
    let c = manager.lookup_type("Shop.C").unwrap();
    assert_eq!(model.base_of(a), Some(b));
    assert_eq!(model.base_of(b), Some(c));
    assert_eq!(model.base_of(c), None);
}

#[test]
fn test_derived_type_rules() {
    let body = format!(
        r#"{}
    <EntityType Name="Vip" BaseType="Self.Customer">
      <Key><PropertyRef Name="Level" /></Key>
      <Property Name="Name" Type="String" />
      <Property Name="Level" Type="Int32" Nullable="false" />
    </EntityType>
    <EntityType Name="Keyless">
      <Property Name="Id" Type="Int32" />
    </EntityType>"#,
        CUSTOMER
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    let mut found = codes(&manager);
    found.sort_by_key(|c| c.number());
    assert_eq!(
        found,
        vec![
            ErrorCode::KeyMissingOnEntityType,
            ErrorCode::KeyOnDerivedEntityType,
            ErrorCode::DuplicateMemberInHierarchy,
        ]
    );
}

#[test]
fn test_key_rules() {
    let body = r#"
    <EntityType Name="Item">
      <Key><PropertyRef Name="Id" /><PropertyRef Name="Id" /><PropertyRef Name="Missing" /></Key>
      <Property Name="Id" Type="Int32" />
    </EntityType>"#;
    let manager = compile(&[("shop.csdl", csdl(body))]);
    assert_eq!(
        codes(&manager),
        vec![ErrorCode::DuplicateKeyProperty, ErrorCode::InvalidPropertyReference]
    );

    let body = r#"
    <EntityType Name="Item">
      <Key><PropertyRef Name="Id" /></Key>
      <Property Name="Id" Type="Int32" />
    </EntityType>"#;
    let manager = compile(&[("shop.csdl", csdl(body))]);
    assert_eq!(codes(&manager), vec![ErrorCode::NullableKeyProperty]);
}

#[test]
fn test_complex_type_containing_itself() {
    let body = r#"
    <ComplexType Name="Node">
      <Property Name="Next" Type="Self.Node" Nullable="false" />
    </ComplexType>"#;
    let manager = compile(&[("shop.csdl", csdl(body))]);
    assert_eq!(codes(&manager), vec![ErrorCode::ComplexTypeCycle]);
}

#[test]
fn test_enum_values_auto_increment() {
    let body = r#"
    <EnumType Name="Color" UnderlyingType="Byte">
      <Member Name="Red" />
      <Member Name="Green" Value="5" />
      <Member Name="Blue" />
      <Member Name="Huge" Value="300" />
    </EnumType>"#;
    let manager = compile(&[("shop.csdl", csdl_with(CSDL_V3_NAMESPACE, "Shop", body))]);
    assert_eq!(codes(&manager), vec![ErrorCode::EnumMemberValueOutOfRange]);

    let color = manager.lookup_type("Shop.Color").unwrap();
    let values: Vec<Option<i64>> = ["Red", "Green", "Blue", "Huge"]
        .iter()
        .map(|name| match &manager.model()[member(&manager, color, name)].kind {
            NodeKind::EnumMember(data) => data.resolved_value,
            other => panic!("not a member: {:?}", other),
        })
        .collect();
    assert_eq!(values, vec![Some(0), Some(5), Some(6), None]);
}

// ============================================================================
// Relationships
// ============================================================================

fn epoch_fixture(declared: &str, code_nullable: bool) -> String {
    format!(
        r#"
    <EntityType Name="Warehouse">
      <Key><PropertyRef Name="Region" /><PropertyRef Name="Code" /></Key>
      <Property Name="Region" Type="Int32" Nullable="false" />
      <Property Name="Code" Type="Int32" Nullable="false" />
    </EntityType>
    <EntityType Name="Shipment">
      <Key><PropertyRef Name="Id" /></Key>
      <Property Name="Id" Type="Int32" Nullable="false" />
      <Property Name="Region" Type="Int32" />
      <Property Name="Code" Type="Int32" Nullable="{}" />
    </EntityType>
    <Association Name="WarehouseShipments">
      <End Role="Warehouse" Type="Self.Warehouse" {} />
      <End Role="Shipment" Type="Self.Shipment" Multiplicity="*" />
      <ReferentialConstraint>
        <Principal Role="Warehouse"><PropertyRef Name="Region" /><PropertyRef Name="Code" /></Principal>
        <Dependent Role="Shipment"><PropertyRef Name="Region" /><PropertyRef Name="Code" /></Dependent>
      </ReferentialConstraint>
    </Association>"#,
        code_nullable, declared
    )
}

#[test]
fn test_principal_multiplicity_depends_on_epoch() {
    let declared = epoch_fixture(r#"Multiplicity="0..1""#, false);

    let v1 = compile(&[("v1.csdl", csdl_with(CSDL_V1_1_NAMESPACE, "Shop", &declared))]);
    assert_eq!(codes(&v1), vec![ErrorCode::InvalidMultiplicityInConstraint]);

    let v2 = compile(&[("v2.csdl", csdl_with(CSDL_V2_NAMESPACE, "Shop", &declared))]);
    assert_eq!(codes(&v2), Vec::<ErrorCode>::new());
}

#[test]
fn test_inferred_principal_multiplicity_depends_on_epoch() {
    let omitted = epoch_fixture("", false);

    let v1 = compile(&[("v1.csdl", csdl_with(CSDL_V1_1_NAMESPACE, "Shop", &omitted))]);
    let association = v1.lookup_type("Shop.WarehouseShipments").unwrap();
    assert_eq!(end_multiplicity(&v1, association, "Warehouse"), Some(Multiplicity::One));

    let v2 = compile(&[("v2.csdl", csdl_with(CSDL_V2_NAMESPACE, "Shop", &omitted))]);
    let association = v2.lookup_type("Shop.WarehouseShipments").unwrap();
    assert_eq!(end_multiplicity(&v2, association, "Warehouse"), Some(Multiplicity::ZeroOrOne));
}

#[test]
fn test_all_nullable_dependent_under_v1_rules() {
    let omitted = epoch_fixture("", true);
    let manager = compile(&[("v1.csdl", csdl_with(CSDL_V1_1_NAMESPACE, "Shop", &omitted))]);
    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());
    let association = manager.lookup_type("Shop.WarehouseShipments").unwrap();
    assert_eq!(
        end_multiplicity(&manager, association, "Warehouse"),
        Some(Multiplicity::ZeroOrOne)
    );

    let declared_one = epoch_fixture(r#"Multiplicity="1""#, true);
    let manager = compile(&[("v1.csdl", csdl_with(CSDL_V1_1_NAMESPACE, "Shop", &declared_one))]);
    assert_eq!(codes(&manager), vec![ErrorCode::InvalidMultiplicityInConstraint]);
}

#[test]
fn test_constraint_property_rules() {
    let body = format!(
        r#"{}{}
    <Association Name="CustomerOrders">
      <End Role="Customer" Type="Self.Customer" Multiplicity="1" />
      <End Role="Order" Type="Self.Order" Multiplicity="*" />
      <ReferentialConstraint>
        <Principal Role="Customer"><PropertyRef Name="Name" /></Principal>
        <Dependent Role="Order"><PropertyRef Name="CustomerId" /></Dependent>
      </ReferentialConstraint>
    </Association>"#,
        CUSTOMER, ORDER
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    assert_eq!(
        codes(&manager),
        vec![
            ErrorCode::InvalidPrincipalProperties,
            ErrorCode::ConstraintPropertyTypeMismatch,
        ]
    );
}

#[test]
fn test_constraint_roles_must_differ() {
    let body = format!(
        r#"{}{}
    <Association Name="CustomerOrders">
      <End Role="Customer" Type="Self.Customer" Multiplicity="1" />
      <End Role="Order" Type="Self.Order" Multiplicity="*" />
      <ReferentialConstraint>
        <Principal Role="Customer"><PropertyRef Name="Id" /></Principal>
        <Dependent Role="Customer"><PropertyRef Name="Id" /></Dependent>
      </ReferentialConstraint>
    </Association>"#,
        CUSTOMER, ORDER
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    assert_eq!(codes(&manager), vec![ErrorCode::SameRoleReferred]);
}

#[test]
fn test_operation_on_many_end() {
    let body = format!(
        r#"{}{}
    <Association Name="CustomerOrders">
      <End Role="Customer" Type="Self.Customer" Multiplicity="1" />
      <End Role="Order" Type="Self.Order" Multiplicity="*">
        <OnDelete Action="Cascade" />
      </End>
    </Association>"#,
        CUSTOMER, ORDER
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    assert_eq!(codes(&manager), vec![ErrorCode::OperationOnManyEnd]);
}

#[test]
fn test_navigation_roles_resolved() {
    let customer = CUSTOMER.replace(
        "</EntityType>",
        r#"<NavigationProperty Name="Orders" Relationship="Self.CustomerOrders" FromRole="Customer" ToRole="Order" />
    </EntityType>"#,
    );
    let body = format!("{}{}{}", customer, ORDER, CUSTOMER_ORDERS);
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());

    let customer = manager.lookup_type("Shop.Customer").unwrap();
    let association = manager.lookup_type("Shop.CustomerOrders").unwrap();
    let navigation = member(&manager, customer, "Orders");
    match &manager.model()[navigation].kind {
        NodeKind::NavigationProperty(data) => {
            assert_eq!(data.resolved_relationship, Some(association));
            assert_eq!(data.from_end, Some(member(&manager, association, "Customer")));
            assert_eq!(data.to_end, Some(member(&manager, association, "Order")));
        }
        other => panic!("not a navigation property: {:?}", other),
    }

    let bad = body.replace(r#"ToRole="Order""#, r#"ToRole="Nobody""#);
    let manager = compile(&[("shop.csdl", csdl(&bad))]);
    assert_eq!(codes(&manager), vec![ErrorCode::InvalidRoleName]);
}

// ============================================================================
// Containers
// ============================================================================

fn association_set_fixture(sets: &str) -> String {
    let body = format!(
        r#"{}{}{}
    <EntityContainer Name="ShopContainer">{}
      <AssociationSet Name="CustomerOrders" Association="Self.CustomerOrders" />
    </EntityContainer>"#,
        CUSTOMER, ORDER, CUSTOMER_ORDERS, sets
    );
    csdl(&body)
}

#[test]
fn test_association_set_ends_inferred() {
    let manager = compile(&[(
        "shop.csdl",
        association_set_fixture(
            r#"
      <EntitySet Name="Customers" EntityType="Self.Customer" />
      <EntitySet Name="Orders" EntityType="Self.Order" />"#,
        ),
    )]);
    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());

    let container = manager.lookup_container("ShopContainer").unwrap();
    let set = member(&manager, container, "CustomerOrders");
    let NodeKind::AssociationSet(data) = &manager.model()[set].kind else {
        panic!("not an association set");
    };
    let bound: Vec<(String, Option<NodeId>)> = data
        .bindings
        .iter()
        .map(|b| (b.role.clone(), b.entity_set))
        .collect();
    assert_eq!(
        bound,
        vec![
            ("Customer".to_string(), Some(member(&manager, container, "Customers"))),
            ("Order".to_string(), Some(member(&manager, container, "Orders"))),
        ]
    );
    assert!(data.bindings.iter().all(|b| b.declared.is_none()));
}

#[test]
fn test_association_set_end_missing_extent() {
    let manager = compile(&[(
        "shop.csdl",
        association_set_fixture(r#"<EntitySet Name="Customers" EntityType="Self.Customer" />"#),
    )]);
    assert_eq!(codes(&manager), vec![ErrorCode::MissingExtent]);
    assert!(manager.diagnostics().items()[0].message.contains("'Order'"));
}

#[test]
fn test_association_set_end_ambiguous_extent() {
    let manager = compile(&[(
        "shop.csdl",
        association_set_fixture(
            r#"
      <EntitySet Name="Customers" EntityType="Self.Customer" />
      <EntitySet Name="FormerCustomers" EntityType="Self.Customer" />
      <EntitySet Name="Orders" EntityType="Self.Order" />"#,
        ),
    )]);
    assert_eq!(codes(&manager), vec![ErrorCode::AmbiguousExtent]);
    let message = &manager.diagnostics().items()[0].message;
    assert!(message.contains("'Customers'") && message.contains("'FormerCustomers'"), "{}", message);
}

#[test]
fn test_declared_association_set_end() {
    let body = format!(
        r#"{}{}{}
    <EntityContainer Name="ShopContainer">
      <EntitySet Name="Customers" EntityType="Self.Customer" />
      <EntitySet Name="FormerCustomers" EntityType="Self.Customer" />
      <EntitySet Name="Orders" EntityType="Self.Order" />
      <AssociationSet Name="CustomerOrders" Association="Self.CustomerOrders">
        <End Role="Customer" EntitySet="FormerCustomers" />
        <End EntitySet="Customers" />
      </AssociationSet>
    </EntityContainer>"#,
        CUSTOMER, ORDER, CUSTOMER_ORDERS
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    assert_eq!(codes(&manager), vec![ErrorCode::InvalidRoleName]);

    let fixed = body.replace(r#"<End EntitySet="Customers" />"#, r#"<End Role="Order" EntitySet="Orders" />"#);
    let manager = compile(&[("shop.csdl", csdl(&fixed))]);
    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());

    let swapped = body.replace(r#"<End EntitySet="Customers" />"#, r#"<End Role="Order" EntitySet="Customers" />"#);
    let manager = compile(&[("shop.csdl", csdl(&swapped))]);
    assert_eq!(codes(&manager), vec![ErrorCode::IncompatibleEntitySet]);
}

#[test]
fn test_container_extension_with_one_duplicate() {
    let body = format!(
        r#"{}{}
    <EntityContainer Name="Derived" Extends="Base">
      <EntitySet Name="Customers" EntityType="Self.Customer" />
      <EntitySet Name="Archive" EntityType="Self.Order" />
    </EntityContainer>
    <EntityContainer Name="Base">
      <EntitySet Name="Customers" EntityType="Self.Customer" />
      <EntitySet Name="Orders" EntityType="Self.Order" />
    </EntityContainer>"#,
        CUSTOMER, ORDER
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    assert_eq!(codes(&manager), vec![ErrorCode::DuplicateInExtendedContainer]);

    let model = manager.model();
    let base = manager.lookup_container("Base").unwrap();
    let derived = manager.lookup_container("Derived").unwrap();
    let members: Vec<&str> = model[derived].kind.member_table().unwrap().keys().collect();
    assert_eq!(members, vec!["Customers", "Archive", "Orders"]);
    assert_eq!(model[base].kind.member_table().unwrap().len(), 2);

    let orders = member(&manager, derived, "Orders");
    assert_eq!(model[orders].cloned_from, Some(member(&manager, base, "Orders")));
    assert_eq!(model[orders].parent, Some(derived));
    assert_eq!(model[member(&manager, derived, "Customers")].cloned_from, None);
}

#[test]
fn test_container_extension_errors() {
    let manager = compile(&[("shop.csdl", csdl(r#"<EntityContainer Name="Loop" Extends="Loop" />"#))]);
    assert_eq!(codes(&manager), vec![ErrorCode::ContainerExtendsItself]);

    let manager = compile(&[("shop.csdl", csdl(r#"<EntityContainer Name="Orphan" Extends="Nowhere" />"#))]);
    assert_eq!(codes(&manager), vec![ErrorCode::BadContainer]);

    let manager = compile(&[(
        "shop.csdl",
        csdl(
            r#"
    <EntityContainer Name="First" Extends="Second" />
    <EntityContainer Name="Second" Extends="First" />"#,
        ),
    )]);
    assert_eq!(codes(&manager), vec![ErrorCode::CyclicContainerExtension]);
}

#[test]
fn test_function_import_entity_sets() {
    let body = format!(
        r#"{}
    <EntityContainer Name="ShopContainer">
      <EntitySet Name="Customers" EntityType="Self.Customer" />
      <FunctionImport Name="AllCustomers" ReturnType="Collection(Self.Customer)" EntitySet="Customers" />
      <FunctionImport Name="TopCustomers" ReturnType="Collection(Self.Customer)" />
      <FunctionImport Name="CountCustomers" ReturnType="Int32" EntitySet="Customers" />
    </EntityContainer>"#,
        CUSTOMER
    );
    let manager = compile(&[("shop.csdl", csdl(&body))]);
    assert_eq!(
        codes(&manager),
        vec![
            ErrorCode::InvalidFunctionImportEntitySet,
            ErrorCode::InvalidFunctionImportEntitySet,
        ]
    );
    let messages: Vec<&str> = manager.diagnostics().items().iter().map(|d| d.message.as_str()).collect();
    assert!(messages[0].contains("TopCustomers"));
    assert!(messages[1].contains("CountCustomers"));
}

// ============================================================================
// Storage documents
// ============================================================================

fn store_table(container: &str, set: &str, table: &str) -> String {
    format!(
        r#"
    <EntityType Name="Person">
      <Key><PropertyRef Name="Id" /></Key>
      <Property Name="Id" Type="Int32" Nullable="false" />
    </EntityType>
    <EntityContainer Name="{}">
      <EntitySet Name="{}" EntityType="Self.Person" Schema="dbo" Table="{}" />
    </EntityContainer>"#,
        container, set, table
    )
}

#[test]
fn test_duplicate_table_across_documents() {
    let a = ssdl(SSDL_V2_NAMESPACE, "StoreA", &store_table("StoreAContainer", "PeopleA", "People"));
    let b = ssdl(SSDL_V2_NAMESPACE, "StoreB", &store_table("StoreBContainer", "PeopleB", "People"));
    let manager = compile(&[("a.ssdl", a), ("b.ssdl", b)]);

    assert_eq!(codes(&manager), vec![ErrorCode::DuplicateTableMapping]);
    let diagnostic = &manager.diagnostics().items()[0];
    assert_eq!(diagnostic.source_location.as_deref(), Some("b.ssdl"));
    assert!(diagnostic.message.contains("'StoreAContainer.PeopleA'"), "{}", diagnostic.message);
    assert!(diagnostic.message.contains("'StoreBContainer.PeopleB'"), "{}", diagnostic.message);
    assert!(diagnostic.message.contains("dbo.People"));
}

#[test]
fn test_defining_query_sets_share_tables() {
    let a = ssdl(SSDL_V2_NAMESPACE, "StoreA", &store_table("StoreAContainer", "PeopleA", "People"));
    let b = ssdl(SSDL_V2_NAMESPACE, "StoreB", &store_table("StoreBContainer", "PeopleB", "People")).replace(
        r#"Table="People" />"#,
        r#"Table="People"><DefiningQuery>SELECT Id FROM dbo.People</DefiningQuery></EntitySet>"#,
    );
    let manager = compile(&[("a.ssdl", a), ("b.ssdl", b)]);
    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());
}

#[test]
fn test_storage_cannot_reference_other_documents() {
    let a = ssdl(SSDL_V2_NAMESPACE, "StoreA", &store_table("StoreAContainer", "PeopleA", "PeopleA"));
    let b = ssdl(
        SSDL_V2_NAMESPACE,
        "StoreB",
        r#"
    <EntityContainer Name="StoreBContainer">
      <EntitySet Name="Borrowed" EntityType="StoreA.Person" />
    </EntityContainer>"#,
    );
    let manager = compile(&[("a.ssdl", a), ("b.ssdl", b)]);
    assert_eq!(codes(&manager), vec![ErrorCode::InvalidTypeReferenceAcrossDocuments]);
}

const MANIFEST: &str = r#"<ProviderManifest xmlns="{grammar}" Namespace="Acme">
  <Types>
    <Type Name="int" PrimitiveTypeKind="Int32" />
    <Type Name="nvarchar" PrimitiveTypeKind="String">
      <FacetDescriptions>
        <MaxLength Minimum="1" Maximum="4000" DefaultValue="4000" Constant="false" />
        <Unicode DefaultValue="true" Constant="true" />
        <FixedLength DefaultValue="false" Constant="true" />
      </FacetDescriptions>
    </Type>
  </Types>
</ProviderManifest>"#;

fn acme_catalog() -> ManifestCatalog {
    let mut manager = SchemaManager::new();
    let document = manager
        .load_str(&MANIFEST.replace("{grammar}", PROVIDER_MANIFEST_NAMESPACE), "acme.xml")
        .unwrap();
    assert!(manager.compile(), "{:?}", manager.diagnostics().items());
    ManifestCatalog::from_model(manager.model(), document).unwrap()
}

#[test]
fn test_store_provider_catalogue() {
    let options = CompileOptions::new().with_store_provider(Arc::new(acme_catalog()));
    let mut manager = SchemaManager::with_options(options);
    let store = ssdl(
        SSDL_V2_NAMESPACE,
        "Store",
        r#"
    <EntityType Name="Person">
      <Key><PropertyRef Name="Id" /></Key>
      <Property Name="Id" Type="int" Nullable="false" />
      <Property Name="Name" Type="nvarchar" MaxLength="50" />
      <Property Name="Bio" Type="nvarchar" MaxLength="5000" />
      <Property Name="Code" Type="nvarchar" Unicode="false" />
    </EntityType>"#,
    );
    manager.load_str(&store, "store.ssdl").unwrap();
    manager.compile();

    assert_eq!(
        codes(&manager),
        vec![ErrorCode::FacetOutOfRange, ErrorCode::ConstantFacetOverridden]
    );
    assert!(manager.lookup_type("Acme.int").is_some());
    assert!(manager.lookup_type("Edm.Int32").is_none());

    let person = manager.lookup_type("Store.Person").unwrap();
    let name = manager.model()[member(&manager, person, "Name")].kind.type_usage().unwrap();
    assert_eq!(name.resolved, manager.lookup_type("Acme.nvarchar"));
    assert_eq!(name.resolved_facets.get(&FacetName::MaxLength), Some(&FacetValue::Integer(50)));
    assert_eq!(name.resolved_facets.get(&FacetName::Unicode), Some(&FacetValue::Bool(true)));
}

#[test]
fn test_manifest_catalogue_from_model() {
    let catalog = acme_catalog();
    let nvarchar = catalog.find_type("nvarchar").unwrap();
    assert_eq!(nvarchar.facets.len(), 3);
    assert_eq!(nvarchar.facets[0].maximum, Some(4000));
}

// ============================================================================
// Compilation units
// ============================================================================

#[test]
fn test_mixed_versions_rejected() {
    let manager = compile(&[
        ("v2.csdl", csdl(CUSTOMER)),
        ("v3.csdl", csdl_with(CSDL_V3_NAMESPACE, "Other", ORDER)),
    ]);
    assert_eq!(codes(&manager), vec![ErrorCode::MixedVersions]);
    assert_eq!(manager.state(), CompileState::Parsed);
}

#[test]
fn test_v1_1_conceptual_pairs_with_v1_storage() {
    let manager = compile(&[
        ("model.csdl", csdl_with(CSDL_V1_1_NAMESPACE, "Shop", CUSTOMER)),
        ("store.ssdl", ssdl(SSDL_V1_NAMESPACE, "Store", &store_table("StoreContainer", "People", "People"))),
    ]);
    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());
}

#[test]
fn test_error_cap_halts_compilation() {
    let properties: String = (0..10)
        .map(|i| format!(r#"<Property Name="P{}" Type="Nowhere.T{}" />"#, i, i))
        .collect();
    let body = format!(r#"<ComplexType Name="Noisy">{}</ComplexType>"#, properties);

    let options = CompileOptions::new().with_limits(Limits::default().with_max_errors(3));
    let mut manager = SchemaManager::with_options(options);
    manager.load_str(&csdl(&body), "noisy.csdl").unwrap();

    assert!(!manager.compile());
    assert!(manager.diagnostics().is_halted());
    assert_eq!(codes(&manager), vec![ErrorCode::BadNamespace; 3]);
    assert!(manager.load_str(&csdl(""), "late.csdl").is_none());
}

#[test]
fn test_load_file_reports_location() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.csdl");
    std::fs::write(&path, csdl(r#"<ComplexType Name="Holder"><Property Name="V" Type="Bogus.T" /></ComplexType>"#))
        .unwrap();

    let mut manager = SchemaManager::new();
    assert!(manager.load_file(&path).is_some());
    assert!(!manager.compile());
    let expected = path.display().to_string();
    assert_eq!(
        manager.diagnostics().items()[0].source_location.as_deref(),
        Some(expected.as_str())
    );

    let mut manager = SchemaManager::new();
    assert!(manager.load_file(dir.path().join("missing.csdl")).is_none());
    assert_eq!(codes(&manager), vec![ErrorCode::IoError]);
}

#[test]
fn test_foreign_annotations_preserved() {
    let body = r#"
    <ComplexType Name="Holder" xmlns:x="urn:extra" x:Tag="kept">
      <x:Note>hello</x:Note>
      <Property Name="V" Type="String" />
    </ComplexType>"#;
    let manager = compile(&[("shop.csdl", csdl(body))]);
    assert_eq!(codes(&manager), Vec::<ErrorCode>::new());
    let holder = manager.lookup_type("Shop.Holder").unwrap();
    assert_eq!(manager.model()[holder].foreign.len(), 2);
}

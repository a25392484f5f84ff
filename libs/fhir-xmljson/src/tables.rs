//! Element name classification tables
//!
//! XML does not distinguish a single occurrence of a repeating element from a
//! non-repeating one, so cardinality is decided by name. All tables are
//! compile-time perfect hash sets.

use phf::phf_set;

/// Marker prefix for attribute keys in dict-shaped XML trees.
pub const ATTRIBUTE_MARKER: char = '@';
/// Key holding element text content in dict-shaped XML trees.
pub const TEXT_KEY: &str = "#text";
/// Attribute-value key before the marker is stripped.
pub const VALUE_ATTRIBUTE_KEY: &str = "@value";

pub const RESOURCE_TYPE_KEY: &str = "resourceType";
pub const NARRATIVE_KEY: &str = "text";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Fields that are always lists in FHIR JSON.
static ARRAY_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "identifier", "name", "address", "telecom", "contact", "photo",
    "communication", "link", "entry", "extension", "modifierExtension",
    "section", "contained", "author", "attester", "custodian", "relatesTo",
    "coding", "component", "dosageInstruction", "profile", "tag",
    "category", "bodySite", "interpretation", "referenceRange",
};

/// Fields that are never lists, even when the source wrapped them in one.
///
/// `line` is deliberately absent: `Address.line` is a string list.
static SCALAR_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "fullUrl", "resource", "request", "method", "url",
    "use", "system", "value", "family", "code", "display", "text",
    "city", "state", "country", "postalCode", "period",
    "status", "div", "reference",
};

/// Resource types that are not DomainResources and carry no narrative.
static NARRATIVE_EXEMPT: phf::Set<&'static str> = phf_set! {
    "Bundle", "Parameters", "Binary",
};

/// Known resource type names (R4 and R5).
static RESOURCE_TYPES: phf::Set<&'static str> = phf_set! {
    "Account", "ActivityDefinition", "ActorDefinition", "AdministrableProductDefinition",
    "AdverseEvent", "AllergyIntolerance", "Appointment", "AppointmentResponse",
    "ArtifactAssessment", "AuditEvent", "Basic", "Binary", "BiologicallyDerivedProduct",
    "BiologicallyDerivedProductDispense", "BodyStructure", "Bundle", "CapabilityStatement",
    "CarePlan", "CareTeam", "CatalogEntry", "ChargeItem", "ChargeItemDefinition", "Citation",
    "Claim", "ClaimResponse", "ClinicalImpression", "ClinicalUseDefinition", "CodeSystem",
    "Communication", "CommunicationRequest", "CompartmentDefinition", "Composition",
    "ConceptMap", "Condition", "ConditionDefinition", "Consent", "Contract", "Coverage",
    "CoverageEligibilityRequest", "CoverageEligibilityResponse", "DetectedIssue", "Device",
    "DeviceAssociation", "DeviceDefinition", "DeviceDispense", "DeviceMetric", "DeviceRequest",
    "DeviceUsage", "DeviceUseStatement", "DiagnosticReport", "DocumentManifest",
    "DocumentReference", "EffectEvidenceSynthesis", "Encounter", "EncounterHistory", "Endpoint",
    "EnrollmentRequest", "EnrollmentResponse", "EpisodeOfCare", "EventDefinition", "Evidence",
    "EvidenceReport", "EvidenceVariable", "ExampleScenario", "ExplanationOfBenefit",
    "FamilyMemberHistory", "Flag", "FormularyItem", "GenomicStudy", "Goal", "GraphDefinition",
    "Group", "GuidanceResponse", "HealthcareService", "ImagingSelection", "ImagingStudy",
    "Immunization", "ImmunizationEvaluation", "ImmunizationRecommendation",
    "ImplementationGuide", "Ingredient", "InsurancePlan", "InventoryItem", "InventoryReport",
    "Invoice", "Library", "Linkage", "List", "Location", "ManufacturedItemDefinition", "Measure",
    "MeasureReport", "Media", "Medication", "MedicationAdministration", "MedicationDispense",
    "MedicationKnowledge", "MedicationRequest", "MedicationStatement", "MedicinalProduct",
    "MedicinalProductAuthorization", "MedicinalProductContraindication",
    "MedicinalProductDefinition", "MedicinalProductIndication", "MedicinalProductIngredient",
    "MedicinalProductInteraction", "MedicinalProductManufactured", "MedicinalProductPackaged",
    "MedicinalProductPharmaceutical", "MedicinalProductUndesirableEffect", "MessageDefinition",
    "MessageHeader", "MolecularSequence", "NamingSystem", "NutritionIntake", "NutritionOrder",
    "NutritionProduct", "Observation", "ObservationDefinition", "OperationDefinition",
    "OperationOutcome", "Organization", "OrganizationAffiliation", "PackagedProductDefinition",
    "Parameters", "Patient", "PaymentNotice", "PaymentReconciliation", "Permission", "Person",
    "PlanDefinition", "Practitioner", "PractitionerRole", "Procedure", "Provenance",
    "Questionnaire", "QuestionnaireResponse", "RegulatedAuthorization", "RelatedPerson",
    "RequestGroup", "RequestOrchestration", "Requirements", "ResearchDefinition",
    "ResearchElementDefinition", "ResearchStudy", "ResearchSubject", "RiskAssessment",
    "RiskEvidenceSynthesis", "Schedule", "SearchParameter", "ServiceRequest", "Slot",
    "Specimen", "SpecimenDefinition", "StructureDefinition", "StructureMap", "Subscription",
    "SubscriptionStatus", "SubscriptionTopic", "Substance", "SubstanceDefinition",
    "SubstanceNucleicAcid", "SubstancePolymer", "SubstanceProtein",
    "SubstanceReferenceInformation", "SubstanceSourceMaterial", "SubstanceSpecification",
    "SupplyDelivery", "SupplyRequest", "Task", "TerminologyCapabilities", "TestPlan",
    "TestReport", "TestScript", "Transport", "ValueSet", "VerificationResult",
    "VisionPrescription",
};

#[inline]
pub fn is_array_element(name: &str) -> bool {
    ARRAY_ELEMENTS.contains(name)
}

#[inline]
pub fn is_scalar_element(name: &str) -> bool {
    SCALAR_ELEMENTS.contains(name)
}

#[inline]
pub fn is_narrative_exempt(resource_type: &str) -> bool {
    NARRATIVE_EXEMPT.contains(resource_type)
}

#[inline]
pub fn is_resource_type(name: &str) -> bool {
    RESOURCE_TYPES.contains(name)
}

/// Namespace declarations are parser artifacts, never resource content.
pub fn is_namespace_declaration(key: &str) -> bool {
    let key = key.strip_prefix(ATTRIBUTE_MARKER).unwrap_or(key);
    key == "xmlns" || key.starts_with("xmlns:")
}

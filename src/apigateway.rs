//! REST API front door: resources, Lambda proxy methods, the request
//! authorizer, CORS preflight and the custom domain.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::Result;
use crate::lambda::FunctionHandle;
use crate::stage::EndpointType;
use crate::template::{intrinsic, Resource, Stack};

pub const PROXY_PATH_PART: &str = "{proxy+}";

/// Seconds an authorizer decision is cached for a given identity source.
pub const AUTHORIZER_CACHE_TTL_SECS: u32 = 300;

const CORS_ALLOW_METHODS: [&str; 7] = ["OPTIONS", "GET", "PUT", "POST", "DELETE", "PATCH", "HEAD"];
const CORS_ALLOW_HEADERS: [&str; 6] = [
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
    "Cookie",
];

/// Browser origins allowed to call the API with credentials.
#[derive(Debug, Clone)]
pub struct CorsOptions {
    pub allow_origins: Vec<String>,
}

/// A node in the API's path tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResource {
    /// `None` for the root resource.
    logical_id: Option<String>,
    path: String,
}

impl ApiResource {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn logical_id(&self) -> Option<&str> {
        self.logical_id.as_deref()
    }
}

/// How a method is protected.
#[derive(Debug, Clone, Copy)]
pub enum Authorization<'a> {
    None,
    Custom(&'a RequestAuthorizer),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAuthorizer {
    logical_id: String,
}

impl RequestAuthorizer {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }
}

#[derive(Debug, Clone)]
struct CustomDomain {
    domain_name: String,
    certificate_arn: Value,
}

/// REST API under construction.
///
/// Resources and methods are emitted as they are added; `finish` emits the
/// deployment (depending on every method), the stage and the custom domain.
#[derive(Debug)]
pub struct RestApi {
    logical_id: String,
    stage_name: String,
    cors: Option<CorsOptions>,
    domain: Option<CustomDomain>,
    /// Every resource, method and authorizer the deployment snapshots.
    member_ids: Vec<String>,
}

impl RestApi {
    pub fn declare(
        stack: &mut Stack,
        name: &str,
        stage_name: &str,
        endpoint_type: EndpointType,
        cors: Option<CorsOptions>,
    ) -> Result<Self> {
        let logical_id = stack.add_resource(
            intrinsic::logical_id(&["RestApi", name]),
            Resource::new(
                "AWS::ApiGateway::RestApi",
                json!({
                    "Name": name,
                    "EndpointConfiguration": { "Types": [endpoint_type.as_str()] },
                }),
            )?,
        )?;
        info!("REST API '{}' declared ({})", name, endpoint_type.as_str());

        let mut api = Self {
            logical_id,
            stage_name: stage_name.to_string(),
            cors,
            domain: None,
            member_ids: Vec::new(),
        };
        let root = api.root();
        api.add_cors_preflight(stack, &root)?;
        Ok(api)
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn root(&self) -> ApiResource {
        ApiResource {
            logical_id: None,
            path: "/".to_string(),
        }
    }

    pub fn stage_logical_id(&self) -> String {
        format!("{}DeploymentStage{}", self.logical_id, self.stage_name)
    }

    pub fn add_resource(
        &mut self,
        stack: &mut Stack,
        parent: &ApiResource,
        path_part: &str,
    ) -> Result<ApiResource> {
        let parent_id = match &parent.logical_id {
            Some(id) => intrinsic::reference(id),
            None => intrinsic::get_att(&self.logical_id, "RootResourceId"),
        };
        let base = parent.logical_id.as_deref().unwrap_or(&self.logical_id);
        let id = stack.add_resource(
            intrinsic::logical_id(&[base, path_part]),
            Resource::new(
                "AWS::ApiGateway::Resource",
                json!({
                    "ParentId": parent_id,
                    "PathPart": path_part,
                    "RestApiId": intrinsic::reference(&self.logical_id),
                }),
            )?,
        )?;

        self.member_ids.push(id.clone());

        let path = match parent.path.as_str() {
            "/" => format!("/{path_part}"),
            parent_path => format!("{parent_path}/{path_part}"),
        };
        let resource = ApiResource {
            logical_id: Some(id),
            path,
        };
        self.add_cors_preflight(stack, &resource)?;
        Ok(resource)
    }

    /// Adds the greedy `{proxy+}` child of `parent`.
    pub fn add_proxy(&mut self, stack: &mut Stack, parent: &ApiResource) -> Result<ApiResource> {
        self.add_resource(stack, parent, PROXY_PATH_PART)
    }

    /// Routes `http_method` on `resource` to `function` through a Lambda
    /// proxy integration.
    pub fn add_method(
        &mut self,
        stack: &mut Stack,
        resource: &ApiResource,
        http_method: &str,
        function: &FunctionHandle,
        authorization: Authorization<'_>,
    ) -> Result<()> {
        let resource_id = self.resource_ref(resource);
        let base = resource.logical_id.as_deref().unwrap_or(&self.logical_id);

        let mut properties = json!({
            "HttpMethod": http_method,
            "ResourceId": resource_id,
            "RestApiId": intrinsic::reference(&self.logical_id),
            "Integration": {
                "IntegrationHttpMethod": "POST",
                "Type": "AWS_PROXY",
                "Uri": invocation_uri(function),
            },
        });
        match authorization {
            Authorization::None => properties["AuthorizationType"] = json!("NONE"),
            Authorization::Custom(authorizer) => {
                properties["AuthorizationType"] = json!("CUSTOM");
                properties["AuthorizerId"] = intrinsic::reference(&authorizer.logical_id);
            }
        }

        let id = stack.add_resource(
            intrinsic::logical_id(&[base, http_method]),
            Resource::new("AWS::ApiGateway::Method", properties)?,
        )?;

        let source_path = resource.path.replace(PROXY_PATH_PART, "*");
        function.allow_api_gateway_invoke(
            stack,
            format!("{id}Permission"),
            self.execute_api_arn(&format!("/*/*{source_path}")),
        )?;
        debug!("Route {} {} -> {}", http_method, resource.path, function.name());

        self.member_ids.push(id);
        Ok(())
    }

    /// REQUEST authorizer keyed on the `header` identity source.
    pub fn add_request_authorizer(
        &mut self,
        stack: &mut Stack,
        scope: &str,
        name: &str,
        function: &FunctionHandle,
        header: &str,
    ) -> Result<RequestAuthorizer> {
        let id = stack.add_resource(
            intrinsic::logical_id(&[scope, name]),
            Resource::new(
                "AWS::ApiGateway::Authorizer",
                json!({
                    "Name": name,
                    "RestApiId": intrinsic::reference(&self.logical_id),
                    "Type": "REQUEST",
                    "AuthorizerUri": invocation_uri(function),
                    "IdentitySource": format!("method.request.header.{header}"),
                    "AuthorizerResultTtlInSeconds": AUTHORIZER_CACHE_TTL_SECS,
                }),
            )?,
        )?;

        let source_arn = intrinsic::join(
            "",
            vec![
                self.execute_api_arn("/authorizers/"),
                intrinsic::reference(&id),
            ],
        );
        function.allow_api_gateway_invoke(stack, format!("{id}Permission"), source_arn)?;
        info!("Request authorizer '{}' declared", name);
        self.member_ids.push(id.clone());

        Ok(RequestAuthorizer { logical_id: id })
    }

    pub fn with_custom_domain(&mut self, domain_name: &str, certificate_arn: Value) {
        self.domain = Some(CustomDomain {
            domain_name: domain_name.to_string(),
            certificate_arn,
        });
    }

    /// Emits the deployment, stage, domain and the endpoint output.
    pub fn finish(self, stack: &mut Stack) -> Result<()> {
        let deployment = self.member_ids.iter().fold(
            Resource::new(
                "AWS::ApiGateway::Deployment",
                json!({
                    "RestApiId": intrinsic::reference(&self.logical_id),
                    "Description": "Automatically created by the RestApi construct",
                }),
            )?,
            |resource, member| resource.depends_on(member.clone()),
        );
        let deployment_id = stack.add_resource(
            format!("{}Deployment{}", self.logical_id, self.deployment_hash(stack)?),
            deployment,
        )?;

        let stage_id = stack.add_resource(
            self.stage_logical_id(),
            Resource::new(
                "AWS::ApiGateway::Stage",
                json!({
                    "RestApiId": intrinsic::reference(&self.logical_id),
                    "DeploymentId": intrinsic::reference(&deployment_id),
                    "StageName": self.stage_name,
                }),
            )?,
        )?;

        if let Some(domain) = &self.domain {
            // The certificate lives in the deploy region, which only a
            // regional domain can use; edge domains need one in us-east-1.
            let properties = json!({
                "DomainName": domain.domain_name,
                "EndpointConfiguration": { "Types": [EndpointType::Regional.as_str()] },
                "RegionalCertificateArn": domain.certificate_arn,
            });
            let domain_id = stack.add_resource(
                format!("{}CustomDomainName", self.logical_id),
                Resource::new("AWS::ApiGateway::DomainName", properties)?,
            )?;

            stack.add_resource(
                format!("{}ApiMapping", self.logical_id),
                Resource::new(
                    "AWS::ApiGateway::BasePathMapping",
                    json!({
                        "DomainName": intrinsic::reference(&domain_id),
                        "RestApiId": intrinsic::reference(&self.logical_id),
                        "Stage": intrinsic::reference(&stage_id),
                    }),
                )?,
            )?;
            info!("Custom domain '{}' mapped", domain.domain_name);
        }

        stack.add_output(
            "ApiEndpoint",
            intrinsic::join(
                "",
                vec![
                    json!("https://"),
                    intrinsic::reference(&self.logical_id),
                    json!(".execute-api."),
                    intrinsic::reference(intrinsic::REGION),
                    json!("."),
                    intrinsic::reference(intrinsic::URL_SUFFIX),
                    json!("/"),
                    intrinsic::reference(&stage_id),
                    json!("/"),
                ],
            ),
            "Invoke URL of the REST API stage",
        );
        Ok(())
    }

    /// Digest of every member's declaration. Any route change yields a new
    /// deployment logical id, so CloudFormation redeploys the stage.
    fn deployment_hash(&self, stack: &Stack) -> Result<String> {
        let mut ids: Vec<&str> = self.member_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();

        let mut hasher = Sha256::new();
        for id in ids {
            hasher.update(id.as_bytes());
            if let Some(resource) = stack.resource(id) {
                hasher.update(serde_json::to_vec(resource)?);
            }
        }
        Ok(hex::encode(&hasher.finalize()[..8]))
    }

    fn resource_ref(&self, resource: &ApiResource) -> Value {
        match &resource.logical_id {
            Some(id) => intrinsic::reference(id),
            None => intrinsic::get_att(&self.logical_id, "RootResourceId"),
        }
    }

    fn execute_api_arn(&self, suffix: &str) -> Value {
        intrinsic::join(
            "",
            vec![
                json!("arn:"),
                intrinsic::reference(intrinsic::PARTITION),
                json!(":execute-api:"),
                intrinsic::reference(intrinsic::REGION),
                json!(":"),
                intrinsic::reference(intrinsic::ACCOUNT_ID),
                json!(":"),
                intrinsic::reference(&self.logical_id),
                json!(suffix),
            ],
        )
    }

    /// Mock `OPTIONS` method answering CORS preflight requests.
    fn add_cors_preflight(&mut self, stack: &mut Stack, resource: &ApiResource) -> Result<()> {
        let Some(cors) = &self.cors else {
            return Ok(());
        };
        let Some(first_origin) = cors.allow_origins.first() else {
            return Ok(());
        };

        let header = |name: &str| format!("method.response.header.{name}");
        let integration_headers = json!({
            header("Access-Control-Allow-Headers"): format!("'{}'", CORS_ALLOW_HEADERS.join(",")),
            header("Access-Control-Allow-Origin"): format!("'{first_origin}'"),
            header("Vary"): "'Origin'",
            header("Access-Control-Allow-Methods"): format!("'{}'", CORS_ALLOW_METHODS.join(",")),
            header("Access-Control-Allow-Credentials"): "'true'",
        });
        let method_headers = json!({
            header("Access-Control-Allow-Headers"): true,
            header("Access-Control-Allow-Origin"): true,
            header("Vary"): true,
            header("Access-Control-Allow-Methods"): true,
            header("Access-Control-Allow-Credentials"): true,
        });

        let base = resource.logical_id.as_deref().unwrap_or(&self.logical_id);
        let id = stack.add_resource(
            intrinsic::logical_id(&[base, "OPTIONS"]),
            Resource::new(
                "AWS::ApiGateway::Method",
                json!({
                    "HttpMethod": "OPTIONS",
                    "ResourceId": self.resource_ref(resource),
                    "RestApiId": intrinsic::reference(&self.logical_id),
                    "AuthorizationType": "NONE",
                    "Integration": {
                        "Type": "MOCK",
                        "RequestTemplates": { "application/json": "{ statusCode: 200 }" },
                        "IntegrationResponses": [{
                            "StatusCode": "204",
                            "ResponseParameters": integration_headers,
                            "ResponseTemplates": {
                                "application/json": origin_override_template(&cors.allow_origins[1..]),
                            },
                        }],
                    },
                    "MethodResponses": [{
                        "StatusCode": "204",
                        "ResponseParameters": method_headers,
                    }],
                }),
            )?,
        )?;
        self.member_ids.push(id);
        Ok(())
    }
}

/// `arn:<partition>:apigateway:<region>:lambda:path/2015-03-31/functions/<fn>/invocations`
fn invocation_uri(function: &FunctionHandle) -> Value {
    intrinsic::join(
        "",
        vec![
            json!("arn:"),
            intrinsic::reference(intrinsic::PARTITION),
            json!(":apigateway:"),
            intrinsic::reference(intrinsic::REGION),
            json!(":lambda:path/2015-03-31/functions/"),
            function.arn(),
            json!("/invocations"),
        ],
    )
}

/// VTL echoing the request origin back when it is one of the extra allowed
/// origins; the first origin is the static default.
fn origin_override_template(extra_origins: &[String]) -> String {
    if extra_origins.is_empty() {
        return String::new();
    }
    let condition = extra_origins
        .iter()
        .map(|origin| format!("$origin == \"{origin}\""))
        .collect::<Vec<_>>()
        .join(" || ");
    format!(
        "#set($origin = $input.params().header.get(\"Origin\"))\n\
         #if($origin == \"\") #set($origin = $input.params().header.get(\"origin\")) #end\n\
         #if({condition})\n  \
         #set($context.responseOverride.header.Access-Control-Allow-Origin = $origin)\n\
         #end"
    )
}
